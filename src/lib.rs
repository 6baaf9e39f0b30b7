// TodoStore - To-do and done items with JSONL snapshot persistence

pub mod item;
pub mod jsonl;
pub mod lifecycle;
pub mod manager;

// Re-export main types for convenience
pub use item::{Location, ToDoItem};
pub use lifecycle::LifecycleEvent;
pub use manager::ItemManager;
