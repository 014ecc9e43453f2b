mod config;

pub use config::{
    EndpointSettings, PolicyVersion, RewardSettings, RunSettings, Settings,
};
