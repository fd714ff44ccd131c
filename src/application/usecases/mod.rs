pub mod list_messages;
pub mod send_bulk;
pub mod send_reply;
