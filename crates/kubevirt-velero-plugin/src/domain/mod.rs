pub mod backup_item_action;
pub mod labels;
#[cfg(test)]
pub(crate) mod mock;
pub mod traits;
pub mod vmi;
