pub mod bins;
pub mod neighbor_list;
pub mod update_settings;

pub use bins::Bins;
pub use neighbor_list::NeighborList;
pub use update_settings::UpdateSettings;
