//! Double-entry accounting: chart of accounts, entry generation on two
//! reporting bases, and the voucher lifecycle.

pub mod chart;
pub mod entry;
pub mod voucher;
