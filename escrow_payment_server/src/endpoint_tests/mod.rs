mod helpers;

mod escrow;
mod orders;
mod payouts;
