pub mod memory;
pub mod message;
pub mod page;
pub mod reaction;
pub mod todo_list;
