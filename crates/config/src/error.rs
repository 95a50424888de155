pub use pocmon_common::{Error, Result};

pocmon_common::impl_context!();
