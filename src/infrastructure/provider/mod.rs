pub mod webhook;
pub mod whatsapp;
