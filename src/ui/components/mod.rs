mod dropdown;
mod input;
mod key_result;

pub use dropdown::{Dropdown, DropdownEvent};
pub use key_result::KeyResult;
