//! # WrapSlurm - a friendlier front-end for SLURM
//!
//! WrapSlurm generates `sbatch` scripts, follows job logs, formats queue and
//! node listings and forwards cancellation requests. When the user leaves
//! resources unspecified it inspects the cluster through `sinfo` and picks
//! a partition, CPU count, memory, GPU count and time limit that fit.
//!
//! ## Resolving a job
//!
//! ```no_run
//! use wrapslurm::config::Defaults;
//! use wrapslurm::inventory::{parse_sinfo, Inventory};
//! use wrapslurm::script::SubmissionScript;
//! use wrapslurm::selector::{ResourceRequest, Selector};
//! use wrapslurm::slurm::SlurmTools;
//!
//! let tools = SlurmTools::from_env();
//! let inventory = Inventory::new(parse_sinfo(&tools.node_inventory().unwrap()));
//! let defaults = Defaults::default();
//!
//! let request = ResourceRequest {
//!     gpus: Some(2),
//!     ..Default::default()
//! };
//! let plan = Selector::new(&inventory, &defaults).select(&request).unwrap();
//!
//! let command = vec!["python".to_string(), "train.py".to_string()];
//! let script = SubmissionScript::new(&plan, &command).unwrap();
//! print!("{}", script.text());
//! ```
//!
//! ## Saved defaults
//!
//! ```no_run
//! use wrapslurm::config::{Defaults, DefaultsStore};
//!
//! let store = DefaultsStore::locate(None).unwrap();
//! let updated = store.load().unwrap().merged_with(&Defaults {
//!     partition: Some("gp4d".into()),
//!     ..Default::default()
//! });
//! store.save(&updated).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod display;
pub mod error;
pub mod inventory;
pub mod logwatch;
pub mod prompt;
pub mod script;
pub mod selector;
pub mod slurm;
pub mod units;

// Re-export commonly used types
pub use config::{CliArgs, Defaults, DefaultsStore};
pub use error::{Result, WrapSlurmError};
pub use inventory::{Inventory, NodeRecord};
pub use selector::{ResourcePlan, ResourceRequest, Selector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use wrapslurm::prelude::*;
    //! ```

    pub use crate::config::{Defaults, DefaultsStore};
    pub use crate::display::{render_nodes, render_queue, render_summary, Highlight, NodeView};
    pub use crate::error::{Result, WrapSlurmError};
    pub use crate::inventory::{parse_scontrol_nodes, parse_sinfo, Inventory, NodeRecord, NodeState};
    pub use crate::script::{srun_args, SubmissionScript};
    pub use crate::selector::{Field, FieldSource, ResourcePlan, ResourceRequest, Selector};
    pub use crate::slurm::SlurmTools;
    pub use crate::units::{MemorySize, TimeLimit};
}
