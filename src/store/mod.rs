// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Record persistence.
//!
//! The crate does not ship a database layer. Callers supply a connection
//! implementing [`RecordStore`] for each record kind (or [`Database`] for
//! all of them at once) and pass it into every registry or service call
//! that needs to read or write records. A connection is only borrowed for
//! the duration of one logical operation and is never held across device
//! I/O.
//!
//! [`InMemoryStore`] is a complete implementation backed by process memory,
//! suitable for tests and for hosts that reload records from elsewhere.

mod memory;

pub use memory::{InMemoryStore, InMemoryTable};

use crate::error::Result;
use crate::record::{
    AcDeviceRecord, BroadlinkAction, BroadlinkDeviceRecord, HueBridgeRecord, Record, RecordId,
};

/// CRUD access to one table of records.
///
/// # Errors
///
/// Implementations report a missing record with [`Error::NotFound`] built
/// from [`Record::not_found`], and a uniqueness violation with
/// [`Error::DuplicateEntry`].
///
/// [`Error::NotFound`]: crate::Error::NotFound
/// [`Error::DuplicateEntry`]: crate::Error::DuplicateEntry
#[allow(async_fn_in_trait)]
pub trait RecordStore<R: Record> {
    /// Stores a new record and returns it as stored.
    async fn create(&self, record: R) -> Result<R>;

    /// Fetches a record by id.
    async fn get(&self, id: RecordId) -> Result<R>;

    /// Fetches a record by its unique name.
    async fn get_by_name(&self, name: &str) -> Result<R>;

    /// Fetches every record in the table.
    async fn get_all(&self) -> Result<Vec<R>>;

    /// Deletes a record by id.
    async fn delete(&self, id: RecordId) -> Result<()>;
}

/// A connection that can reach every table this crate uses.
pub trait Database:
    RecordStore<AcDeviceRecord>
    + RecordStore<BroadlinkDeviceRecord>
    + RecordStore<HueBridgeRecord>
    + RecordStore<BroadlinkAction>
{
}

impl<T> Database for T where
    T: RecordStore<AcDeviceRecord>
        + RecordStore<BroadlinkDeviceRecord>
        + RecordStore<HueBridgeRecord>
        + RecordStore<BroadlinkAction>
{
}
