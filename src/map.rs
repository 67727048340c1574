/// Contains everything needed to handle coordinates.
pub mod coordinates;
/// The map widget.
pub mod map_widget;
/// What the map offers to place markers.
pub mod markers;
/// Map tile functionality.
mod tile_loader;
