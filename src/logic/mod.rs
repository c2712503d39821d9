//! Domain operations. Each one takes the store explicitly along with the
//! current time, so the HTTP layer stays a thin translation.

pub mod catalog;
pub mod identity;
pub mod polls;
pub mod teams;
pub mod votes;
