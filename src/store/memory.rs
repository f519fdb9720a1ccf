// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory record tables.

use parking_lot::RwLock;

use super::RecordStore;
use crate::error::{Error, Result};
use crate::record::{
    AcDeviceRecord, BroadlinkAction, BroadlinkDeviceRecord, HueBridgeRecord, Record, RecordId,
};

/// One table of records held in memory.
///
/// Rows keep insertion order so `get_all` is stable. Names are unique, and
/// so are addresses for record kinds that have one.
#[derive(Debug)]
pub struct InMemoryTable<R> {
    rows: RwLock<Vec<R>>,
}

impl<R: Record> InMemoryTable<R> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn insert(&self, record: R) -> Result<R> {
        let mut rows = self.rows.write();

        let clash = rows.iter().find_map(|row| {
            if row.id() == record.id() {
                Some(("id", record.id().to_string()))
            } else if row.name() == record.name() {
                Some(("name", record.name().to_string()))
            } else if let (Some(a), Some(b)) = (row.address(), record.address())
                && a == b
            {
                Some(("ip_address", b.to_string()))
            } else {
                None
            }
        });
        if let Some((field, value)) = clash {
            return Err(Error::DuplicateEntry {
                entity: R::ENTITY,
                field,
                value,
            });
        }

        tracing::debug!(entity = R::ENTITY, id = %record.id(), name = record.name(), "Record created");
        rows.push(record.clone());
        Ok(record)
    }

    fn find(&self, id: RecordId) -> Result<R> {
        self.rows
            .read()
            .iter()
            .find(|row| row.id() == id)
            .cloned()
            .ok_or_else(|| R::not_found("id", id.to_string()).into())
    }

    fn find_by_name(&self, name: &str) -> Result<R> {
        self.rows
            .read()
            .iter()
            .find(|row| row.name() == name)
            .cloned()
            .ok_or_else(|| R::not_found("name", name).into())
    }

    fn all(&self) -> Vec<R> {
        self.rows.read().clone()
    }

    fn remove(&self, id: RecordId) -> Result<()> {
        let mut rows = self.rows.write();
        let index = rows
            .iter()
            .position(|row| row.id() == id)
            .ok_or_else(|| R::not_found("id", id.to_string()))?;
        rows.remove(index);
        tracing::debug!(entity = R::ENTITY, %id, "Record deleted");
        Ok(())
    }
}

impl<R: Record> Default for InMemoryTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordStore<R> for InMemoryTable<R> {
    async fn create(&self, record: R) -> Result<R> {
        self.insert(record)
    }

    async fn get(&self, id: RecordId) -> Result<R> {
        self.find(id)
    }

    async fn get_by_name(&self, name: &str) -> Result<R> {
        self.find_by_name(name)
    }

    async fn get_all(&self) -> Result<Vec<R>> {
        Ok(self.all())
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        self.remove(id)
    }
}

/// Every table this crate uses, held in memory.
///
/// # Examples
///
/// ```
/// use homecontrol::record::BroadlinkAction;
/// use homecontrol::store::{InMemoryStore, RecordStore};
///
/// # async fn example() -> homecontrol::Result<()> {
/// let store = InMemoryStore::new();
/// let action = BroadlinkAction::new("tv_power", vec![0x26, 0x00, 0x10]);
/// RecordStore::<BroadlinkAction>::create(&store, action).await?;
///
/// let found = RecordStore::<BroadlinkAction>::get_by_name(&store, "tv_power").await?;
/// assert_eq!(found.packet, vec![0x26, 0x00, 0x10]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    ac_devices: InMemoryTable<AcDeviceRecord>,
    broadlink_devices: InMemoryTable<BroadlinkDeviceRecord>,
    hue_bridges: InMemoryTable<HueBridgeRecord>,
    broadlink_actions: InMemoryTable<BroadlinkAction>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! delegate_table {
    ($record:ty => $field:ident) => {
        impl RecordStore<$record> for InMemoryStore {
            async fn create(&self, record: $record) -> Result<$record> {
                self.$field.create(record).await
            }

            async fn get(&self, id: RecordId) -> Result<$record> {
                self.$field.get(id).await
            }

            async fn get_by_name(&self, name: &str) -> Result<$record> {
                self.$field.get_by_name(name).await
            }

            async fn get_all(&self) -> Result<Vec<$record>> {
                self.$field.get_all().await
            }

            async fn delete(&self, id: RecordId) -> Result<()> {
                self.$field.delete(id).await
            }
        }
    };
}

delegate_table!(AcDeviceRecord => ac_devices);
delegate_table!(BroadlinkDeviceRecord => broadlink_devices);
delegate_table!(HueBridgeRecord => hue_bridges);
delegate_table!(BroadlinkAction => broadlink_actions);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotFoundError;

    #[tokio::test]
    async fn create_then_lookup() {
        let table = InMemoryTable::new();
        let record = BroadlinkDeviceRecord::new("Lounge", "192.168.1.40");
        table.create(record.clone()).await.unwrap();

        assert_eq!(table.get(record.id).await.unwrap(), record);
        assert_eq!(table.get_by_name("Lounge").await.unwrap(), record);
        assert_eq!(table.get_all().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let table = InMemoryTable::new();
        table
            .create(BroadlinkDeviceRecord::new("Lounge", "192.168.1.40"))
            .await
            .unwrap();

        let err = table
            .create(BroadlinkDeviceRecord::new("Lounge", "192.168.1.41"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateEntry { field: "name", .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_address_is_rejected() {
        let table = InMemoryTable::new();
        table
            .create(AcDeviceRecord::new("Bedroom", "192.168.1.5", 1, "k", "t"))
            .await
            .unwrap();

        let err = table
            .create(AcDeviceRecord::new("Study", "192.168.1.5", 2, "k", "t"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "duplicate entry: air conditioning unit with ip_address '192.168.1.5' already exists"
        );
    }

    #[tokio::test]
    async fn actions_only_clash_on_name() {
        let table = InMemoryTable::new();
        table
            .create(BroadlinkAction::new("on", vec![1]))
            .await
            .unwrap();
        table
            .create(BroadlinkAction::new("off", vec![1]))
            .await
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let table: InMemoryTable<HueBridgeRecord> = InMemoryTable::new();
        let err = table.delete(RecordId::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound(NotFoundError::Device { field: "id", .. })
        ));
    }

    #[tokio::test]
    async fn store_keeps_tables_apart() {
        let store = InMemoryStore::new();
        RecordStore::<BroadlinkDeviceRecord>::create(
            &store,
            BroadlinkDeviceRecord::new("Lounge", "192.168.1.40"),
        )
        .await
        .unwrap();

        let actions = RecordStore::<BroadlinkAction>::get_all(&store).await.unwrap();
        assert!(actions.is_empty());
        let devices = RecordStore::<BroadlinkDeviceRecord>::get_all(&store)
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
    }
}
