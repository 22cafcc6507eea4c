//! API request handlers

mod clients;
mod contracts;
mod demo;
mod health;
mod vehicles;

pub use clients::*;
pub use contracts::*;
pub use demo::*;
pub use health::*;
pub use vehicles::*;

use serde::{Deserialize, Serialize};

/// Delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: i64,
    pub deleted: bool,
}
