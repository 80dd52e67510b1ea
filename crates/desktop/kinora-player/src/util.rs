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

use std::fmt::Debug;

/// Logs and discards errors at fire-and-forget boundaries.
pub trait ResultExt<E> {
    type Ok;

    fn log_err(self) -> Option<Self::Ok>;

    /// Like [`ResultExt::log_err`] at `warn` level, tagged with what was being
    /// attempted.
    fn warn_on_err(self, context: &str) -> Option<Self::Ok>;
}

impl<T, E> ResultExt<E> for Result<T, E>
where
    E: Debug,
{
    type Ok = T;

    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    error = ?error,
                    caller.file = %loc.file(),
                    caller.line = loc.line(),
                    caller.col  = loc.column(),
                    "error"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let loc = std::panic::Location::caller();
                tracing::warn!(
                    error = ?error,
                    caller.file = %loc.file(),
                    caller.line = loc.line(),
                    "{context} failed"
                );
                None
            }
        }
    }
}
