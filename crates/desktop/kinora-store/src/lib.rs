// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistent storage for Kinora: a SQLite-backed key-value store and the
//! volume preference kept on top of it.

pub mod config;
pub mod db;
pub mod err;
pub mod kv;
pub mod prefs;

pub use config::DatabaseConfig;
pub use db::DBStore;
pub use kv::KVStore;
pub use prefs::{PreferenceStore, PreferenceWriter, VOLUME_KEY};
