pub mod anchor;
pub mod claim;
pub mod digest;
pub mod embed;
pub mod lookup;
pub mod track;
pub mod verify;
