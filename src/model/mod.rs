pub mod chat;
pub mod fields;
pub mod generated;
pub mod work_item;
