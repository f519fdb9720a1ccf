// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the CLIP v2 API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::error::{Error, HueError, NotFoundError, ProtocolError, Result};

use super::schema::{
    DeviceGet, Envelope, GroupedLightGet, GroupedLightPut, KeyReply, KeyRequest, LightGet,
    LightPut, ResourceIdentifier, RoomGet, RoomPost, RoomPut, SceneGet, ScenePost, ScenePut,
};

/// Root certificate that signs every Hue bridge's TLS certificate.
///
/// See <https://developers.meethue.com/develop/application-design-guidance/using-https/>.
pub const HUE_ROOT_CA: &[u8] = b"-----BEGIN CERTIFICATE-----
MIICMjCCAdigAwIBAgIUO7FSLbaxikuXAljzVaurLXWmFw4wCgYIKoZIzj0EAwIw
OTELMAkGA1UEBhMCTkwxFDASBgNVBAoMC1BoaWxpcHMgSHVlMRQwEgYDVQQDDAty
b290LWJyaWRnZTAiGA8yMDE3MDEwMTAwMDAwMFoYDzIwMzgwMTE5MDMxNDA3WjA5
MQswCQYDVQQGEwJOTDEUMBIGA1UECgwLUGhpbGlwcyBIdWUxFDASBgNVBAMMC3Jv
b3QtYnJpZGdlMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEjNw2tx2AplOf9x86
aTdvEcL1FU65QDxziKvBpW9XXSIcibAeQiKxegpq8Exbr9v6LBnYbna2VcaK0G22
jOKkTqOBuTCBtjAPBgNVHRMBAf8EBTADAQH/MA4GA1UdDwEB/wQEAwIBhjAdBgNV
HQ4EFgQUZ2ONTFrDT6o8ItRnKfqWKnHFGmQwdAYDVR0jBG0wa4AUZ2ONTFrDT6o8
ItRnKfqWKnHFGmShPaQ7MDkxCzAJBgNVBAYTAk5MMRQwEgYDVQQKDAtQaGlsaXBz
IEh1ZTEUMBIGA1UEAwwLcm9vdC1icmlkZ2WCFDuxUi22sYpLlwJY81Wrqy11phcO
MAoGCCqGSM49BAMCA0gAMEUCIEBYYEOsa07TH7E5MJnGw557lVkORgit2Rm1h3B2
sFgDAiEA1Fj/C3AN5psFMjo0//mrQebo0eKd3aWRx+pQY08mk48=
-----END CERTIFICATE-----
";

/// Default timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials issued by a bridge after its link button was pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationKey {
    /// Value of the `hue-application-key` header.
    pub username: String,
    /// Entertainment client key.
    pub client_key: String,
}

/// Thin typed wrapper over the bridge's HTTPS API.
///
/// Bridges present a certificate signed by the Hue root CA whose subject is
/// the bridge id rather than its address, so the CA is pinned and hostname
/// verification is disabled.
#[derive(Debug, Clone)]
pub struct HueClient {
    http: reqwest::Client,
    base_url: String,
    address: String,
}

impl HueClient {
    /// Creates a client for the bridge at `address` (`ip` or `ip:port`).
    ///
    /// Without an application key only [`request_key`](Self::request_key)
    /// will succeed.
    ///
    /// # Errors
    ///
    /// - [`HueError::InvalidApplicationKey`] if the key is not a valid header value.
    /// - [`Error::Protocol`] if `ca_cert` is not a PEM certificate.
    pub fn new(address: &str, application_key: Option<&str>, ca_cert: &[u8]) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = application_key {
            let value = HeaderValue::from_str(key).map_err(|_| HueError::InvalidApplicationKey {
                address: address.to_string(),
            })?;
            headers.insert(HeaderName::from_static("hue-application-key"), value);
        }

        let certificate = reqwest::Certificate::from_pem(ca_cert).map_err(ProtocolError::from)?;
        let http = reqwest::Client::builder()
            .add_root_certificate(certificate)
            .danger_accept_invalid_hostnames(true)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ProtocolError::from)?;

        Ok(Self {
            http,
            base_url: format!("https://{address}"),
            address: address.to_string(),
        })
    }

    /// Sends requests to `base_url` instead of `https://{address}`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the bridge address this client was created for.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    // ========================================================================
    // Generic resource access
    // ========================================================================

    /// Lists every resource of type `rtype`.
    ///
    /// # Errors
    ///
    /// Returns [`HueError::Api`] if the bridge rejects the request,
    /// [`Error::Protocol`] on transport failure, or [`Error::Json`] if the
    /// body does not match `T`.
    pub async fn get_resources<T: DeserializeOwned>(&self, rtype: &str) -> Result<Vec<T>> {
        self.send::<T, ()>(Method::GET, &resource_path(rtype, None), None)
            .await
    }

    /// Fetches one resource.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources), plus a not-found error if
    /// the bridge answers with an empty list.
    pub async fn get_resource<T: DeserializeOwned>(&self, rtype: &str, id: &str) -> Result<T> {
        self.send::<T, ()>(Method::GET, &resource_path(rtype, Some(id)), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                NotFoundError::Entry {
                    entity: rtype.to_string(),
                    field: "id",
                    value: id.to_string(),
                }
                .into()
            })
    }

    /// Applies a patch to one resource.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn put_resource<B: Serialize + ?Sized>(
        &self,
        rtype: &str,
        id: &str,
        body: &B,
    ) -> Result<Vec<ResourceIdentifier>> {
        self.send(Method::PUT, &resource_path(rtype, Some(id)), Some(body))
            .await
    }

    /// Creates a resource.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn post_resource<B: Serialize + ?Sized>(
        &self,
        rtype: &str,
        body: &B,
    ) -> Result<Vec<ResourceIdentifier>> {
        self.send(Method::POST, &resource_path(rtype, None), Some(body))
            .await
    }

    /// Deletes a resource.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn delete_resource(&self, rtype: &str, id: &str) -> Result<Vec<ResourceIdentifier>> {
        self.send::<ResourceIdentifier, ()>(Method::DELETE, &resource_path(rtype, Some(id)), None)
            .await
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    /// Lists every light.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn get_lights(&self) -> Result<Vec<LightGet>> {
        self.get_resources("light").await
    }

    /// Fetches one light.
    ///
    /// # Errors
    ///
    /// As [`get_resource`](Self::get_resource).
    pub async fn get_light(&self, id: &str) -> Result<LightGet> {
        self.get_resource("light", id).await
    }

    /// Patches one light.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn put_light(&self, id: &str, patch: &LightPut) -> Result<Vec<ResourceIdentifier>> {
        self.put_resource("light", id, patch).await
    }

    /// Fetches one grouped light.
    ///
    /// # Errors
    ///
    /// As [`get_resource`](Self::get_resource).
    pub async fn get_grouped_light(&self, id: &str) -> Result<GroupedLightGet> {
        self.get_resource("grouped_light", id).await
    }

    /// Patches one grouped light.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn put_grouped_light(
        &self,
        id: &str,
        patch: &GroupedLightPut,
    ) -> Result<Vec<ResourceIdentifier>> {
        self.put_resource("grouped_light", id, patch).await
    }

    /// Fetches one device.
    ///
    /// # Errors
    ///
    /// As [`get_resource`](Self::get_resource).
    pub async fn get_device(&self, id: &str) -> Result<DeviceGet> {
        self.get_resource("device", id).await
    }

    /// Lists every room.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn get_rooms(&self) -> Result<Vec<RoomGet>> {
        self.get_resources("room").await
    }

    /// Fetches one room.
    ///
    /// # Errors
    ///
    /// As [`get_resource`](Self::get_resource).
    pub async fn get_room(&self, id: &str) -> Result<RoomGet> {
        self.get_resource("room", id).await
    }

    /// Patches one room.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn put_room(&self, id: &str, patch: &RoomPut) -> Result<Vec<ResourceIdentifier>> {
        self.put_resource("room", id, patch).await
    }

    /// Creates a room.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn post_room(&self, room: &RoomPost) -> Result<Vec<ResourceIdentifier>> {
        self.post_resource("room", room).await
    }

    /// Deletes a room.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn delete_room(&self, id: &str) -> Result<Vec<ResourceIdentifier>> {
        self.delete_resource("room", id).await
    }

    /// Lists every scene.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn get_scenes(&self) -> Result<Vec<SceneGet>> {
        self.get_resources("scene").await
    }

    /// Fetches one scene.
    ///
    /// # Errors
    ///
    /// As [`get_resource`](Self::get_resource).
    pub async fn get_scene(&self, id: &str) -> Result<SceneGet> {
        self.get_resource("scene", id).await
    }

    /// Patches one scene.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn put_scene(&self, id: &str, patch: &ScenePut) -> Result<Vec<ResourceIdentifier>> {
        self.put_resource("scene", id, patch).await
    }

    /// Creates a scene.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn post_scene(&self, scene: &ScenePost) -> Result<Vec<ResourceIdentifier>> {
        self.post_resource("scene", scene).await
    }

    /// Deletes a scene.
    ///
    /// # Errors
    ///
    /// As [`get_resources`](Self::get_resources).
    pub async fn delete_scene(&self, id: &str) -> Result<Vec<ResourceIdentifier>> {
        self.delete_resource("scene", id).await
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Asks the bridge for a new application key.
    ///
    /// Succeeds only within 30 seconds of the link button being pressed.
    ///
    /// # Errors
    ///
    /// - [`HueError::ButtonNotPressed`] if the bridge answers with error 101.
    /// - [`HueError::UnexpectedAuthResponse`] for any other answer.
    /// - [`Error::Protocol`] on transport failure.
    pub async fn request_key(&self, devicetype: &str) -> Result<ApplicationKey> {
        let url = format!("{}/api", self.base_url);
        tracing::debug!(address = %self.address, devicetype, "Requesting application key");

        let response = self
            .http
            .post(&url)
            .json(&KeyRequest {
                devicetype,
                generateclientkey: true,
            })
            .send()
            .await
            .map_err(ProtocolError::from)?;
        let body = response.text().await.map_err(ProtocolError::from)?;

        let unexpected = || HueError::UnexpectedAuthResponse {
            address: self.address.clone(),
            body: body.clone(),
        };
        let first = serde_json::from_str::<Vec<serde_json::Value>>(&body)
            .ok()
            .and_then(|replies| replies.into_iter().next())
            .and_then(|reply| serde_json::from_value::<KeyReply>(reply).ok())
            .ok_or_else(unexpected)?;

        match first {
            KeyReply::Success(key) => {
                tracing::info!(address = %self.address, "Application key issued");
                Ok(ApplicationKey {
                    username: key.username,
                    client_key: key.clientkey,
                })
            }
            KeyReply::Error(e) if e.kind == 101 => Err(HueError::ButtonNotPressed {
                address: self.address.clone(),
            }
            .into()),
            KeyReply::Error(_) => Err(unexpected().into()),
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(address = %self.address, %method, %path, "Hue request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(ProtocolError::from)?;
        read_envelope(response).await
    }
}

fn resource_path(rtype: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("/clip/v2/resource/{rtype}/{}", urlencoding::encode(id)),
        None => format!("/clip/v2/resource/{rtype}"),
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Vec<T>> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.bytes().await.map_err(ProtocolError::from)?;

    if status.as_u16() >= 400 {
        let mut messages: Vec<String> = serde_json::from_slice::<Envelope<IgnoredAny>>(&body)
            .map(|envelope| envelope.errors.into_iter().map(|e| e.description).collect())
            .unwrap_or_default();
        if messages.is_empty() {
            messages.push(status.canonical_reason().unwrap_or("request failed").to_string());
        }
        tracing::debug!(status = status.as_u16(), %url, ?messages, "Hue request rejected");
        return Err(Error::Hue(HueError::Api {
            status: status.as_u16(),
            url,
            messages,
        }));
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body)?;
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths() {
        assert_eq!(resource_path("light", None), "/clip/v2/resource/light");
        assert_eq!(
            resource_path("scene", Some("a b")),
            "/clip/v2/resource/scene/a%20b"
        );
    }

    #[test]
    fn builtin_ca_is_accepted() {
        let client = HueClient::new("192.168.1.2", Some("key"), HUE_ROOT_CA).unwrap();
        assert_eq!(client.address(), "192.168.1.2");
        assert_eq!(client.base_url, "https://192.168.1.2");
    }

    #[test]
    fn header_breaking_key_is_rejected() {
        let err = HueClient::new("192.168.1.2", Some("bad\nkey"), HUE_ROOT_CA).unwrap_err();
        assert!(matches!(
            err,
            Error::Hue(HueError::InvalidApplicationKey { .. })
        ));
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let client = HueClient::new("bridge", None, HUE_ROOT_CA)
            .unwrap()
            .with_base_url("http://127.0.0.1:8080/");
        assert_eq!(client.base_url, "http://127.0.0.1:8080");
    }
}
