// Optional apps.
pub mod humanize;
