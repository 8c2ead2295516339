pub mod card_id;
pub mod filter;
pub mod spec;
