// Reference server fleet state

pub mod store;

pub use store::{is_global, FleetChange, FleetStore, IngestOutcome, VesselQuery};
