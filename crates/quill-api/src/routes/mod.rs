//! HTTP route handlers.
//!
//! | Route                     | Module      | Auth            |
//! |---------------------------|-------------|-----------------|
//! | `POST /upload`            | [`uploads`] | admin           |
//! | `POST /v1/cards/resolve`  | [`cards`]   | any role        |
//! | `GET /uploads/*`          | [`assets`]  | none            |
//! | `GET /placeholder.svg`    | [`assets`]  | none            |
//! | `GET /health/*`           | [`health`]  | none            |
//! | `GET /metrics`            | [`health`]  | none            |

pub mod assets;
pub mod cards;
pub mod health;
pub mod uploads;
