// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Object-created notifications delivered by the storage service.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct S3Object {
    /// Key as delivered in the notification, form-url-encoded.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A bucket/key pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef<'a> {
    pub bucket: &'a str,
    pub key: Cow<'a, str>,
}

impl S3Event {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// The objects named by the event, in record order. Records that carry no storage section are
    /// skipped.
    pub fn objects(&self) -> impl Iterator<Item = ObjectRef<'_>> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match &record.s3 {
                Some(entity) => Some(ObjectRef {
                    bucket: &entity.bucket.name,
                    key: decode_object_key(&entity.object.key),
                }),
                None => {
                    warn!(
                        "Ignoring record {index} ({}) without an s3 section",
                        record.event_name.as_deref().unwrap_or("unknown event")
                    );
                    None
                }
            })
    }
}

/// Decodes a notification key: `+` is a space and `%XX` an escaped byte.
///
/// Malformed escapes are kept literally. Keys that decode to invalid UTF-8 are returned unchanged.
pub fn decode_object_key(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['+', '%']) {
        return Cow::Borrowed(raw);
    }

    let spaced = raw.replace('+', " ");
    match percent_decode_str(&spaced).decode_utf8() {
        Ok(key) => Cow::Owned(key.into_owned()),
        Err(_) => Cow::Borrowed(raw),
    }
}
