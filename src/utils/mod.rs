mod convert;
mod format;

pub use convert::format_units;
pub use convert::parse_units;
pub use convert::wei_to_ether;
pub use format::short_address;
pub use format::format_rate;
