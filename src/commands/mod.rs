//! Commands module
//!
//! User-facing operations behind the command line subcommands.

pub mod catalog;
pub mod compress;
pub mod local_image;
pub mod operations;

use crate::config::Config;
use crate::flash::{DeviceProgrammer, PortLister};
use crate::transport::Transport;
use crate::ui::Interaction;

/// Collaborators shared by every operation of one run
pub struct Session<'a> {
    pub config: &'a Config,
    pub transport: &'a dyn Transport,
    pub ports: &'a dyn PortLister,
    pub ui: &'a mut dyn Interaction,
    pub programmer: &'a mut dyn DeviceProgrammer,
}
