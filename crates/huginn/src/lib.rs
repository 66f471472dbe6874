pub mod client;
pub mod probe;

pub use client::{
    AgentLinks, Automation, AutomationError, DynAutomation, HuginnClient, HuginnConfig,
};
pub use probe::{ChannelMeta, ChannelProbe, DynChannelProbe, HttpChannelProbe, ProbeError};
