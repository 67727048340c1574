/// Owner of the shop state.
pub mod controller;
pub mod feature;
pub mod filter;
/// "Where am I" lookups.
pub mod geolocation;
/// Marker replacement with fades.
pub mod reconciler;
/// Loading of the shop document.
pub mod store;

#[cfg(test)]
pub mod test_utils;
