//! Lead-capture API adapters.

mod captcha;
mod client;
mod dto;

pub use captcha::ProvidedTokenWidget;
pub use client::{HttpFormClient, VERIFY_TIMEOUT};
