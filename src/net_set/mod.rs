//! The ten trained networks one inversion run needs, keyed by pipeline role.

use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::nn::{ActivationMode, NeuralNet};
use crate::sensor::Sensor;

pub mod discovery;
pub mod error;
mod paths;

pub use error::NetSetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetRole {
    /// Autoassociative TOSA reflectance net, the out-of-scope detector.
    RtosaAann,
    /// TOSA reflectance to path reflectance.
    RtosaRpath,
    /// TOSA reflectance to water-leaving reflectance.
    RtosaRw,
    /// TOSA reflectance to downward and upward transmittance.
    RtosaTrans,
    /// IOPs back to water-leaving reflectance.
    IopRw,
    /// IOPs to their log-space uncertainties.
    IopUnciop,
    /// IOPs to uncertainties of `adg, atot, btot, kd489, kdmin`.
    IopUncsumiopUnckd,
    /// Water-leaving reflectance to IOPs.
    RwIop,
    /// Water-leaving reflectance to `kdmin, kd489`.
    RwKd,
    /// Water-leaving reflectance to its nadir-normalised form.
    RwRwnorm,
}

impl NetRole {
    pub const ALL: [NetRole; 10] = [
        NetRole::RtosaAann,
        NetRole::RtosaRpath,
        NetRole::RtosaRw,
        NetRole::RtosaTrans,
        NetRole::IopRw,
        NetRole::IopUnciop,
        NetRole::IopUncsumiopUnckd,
        NetRole::RwIop,
        NetRole::RwKd,
        NetRole::RwRwnorm,
    ];

    /// Subdirectory name of this role inside a net directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            NetRole::RtosaAann => "rtosa_aann",
            NetRole::RtosaRpath => "rtosa_rpath",
            NetRole::RtosaRw => "rtosa_rw",
            NetRole::RtosaTrans => "rtosa_trans",
            NetRole::IopRw => "iop_rw",
            NetRole::IopUnciop => "iop_unciop",
            NetRole::IopUncsumiopUnckd => "iop_uncsumiop_unckd",
            NetRole::RwIop => "rw_iop",
            NetRole::RwKd => "rw_kd",
            NetRole::RwRwnorm => "rw_rwnorm",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for NetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Which net set to load.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetSetId {
    Standard,
    Extreme,
    /// Directory with one subdirectory per role, see [`discovery::discover`].
    Custom(PathBuf),
}

impl NetSetId {
    fn name(&self) -> &'static str {
        match self {
            NetSetId::Standard => "standard",
            NetSetId::Extreme => "extreme",
            NetSetId::Custom(_) => "custom",
        }
    }
}

/// A complete bundle of ten networks, one per [`NetRole`].
#[derive(Debug, Clone)]
pub struct NetSet {
    // Indexed by `NetRole::index`, always ten entries.
    nets: Vec<NeuralNet>,
    sources: Vec<String>,
}

impl NetSet {
    /// Loads a named set from `resource_root` or a custom directory.
    pub fn load(id: &NetSetId, sensor: Sensor, resource_root: &Path) -> Result<Self, NetSetError> {
        let files: Vec<(NetRole, PathBuf)> = match (id, sensor) {
            (NetSetId::Custom(dir), _) => discovery::discover(dir)?,
            (NetSetId::Standard, Sensor::Meris) => resolve(resource_root, paths::meris_standard()),
            (NetSetId::Extreme, Sensor::Meris) => resolve(resource_root, paths::meris_extreme()),
            (named, sensor) => {
                return Err(NetSetError::UnknownNetSet {
                    sensor,
                    set: named.name(),
                });
            }
        };

        let mut loaded = Vec::with_capacity(files.len());
        for (role, path) in files {
            let net = NeuralNet::from_file(&path).map_err(|source| NetSetError::Load {
                role,
                path: path.clone(),
                source,
            })?;
            debug!(
                role = %role,
                path = %path.display(),
                topology = ?net.layer_sizes(),
                "loaded net"
            );
            loaded.push((role, path.display().to_string(), net));
        }

        let set = Self::assemble(loaded)?;
        info!(set = id.name(), sensor = %sensor, "net set loaded");
        Ok(set)
    }

    /// Builds a set from networks already in memory.
    pub fn from_nets<I>(nets: I) -> Result<Self, NetSetError>
    where
        I: IntoIterator<Item = (NetRole, NeuralNet)>,
    {
        Self::assemble(
            nets.into_iter()
                .map(|(role, net)| (role, format!("<memory>/{}", role), net)),
        )
    }

    fn assemble<I>(nets: I) -> Result<Self, NetSetError>
    where
        I: IntoIterator<Item = (NetRole, String, NeuralNet)>,
    {
        let mut slots: [Option<(String, NeuralNet)>; 10] = Default::default();
        for (role, source, net) in nets {
            let slot = &mut slots[role.index()];
            if slot.is_some() {
                return Err(NetSetError::DuplicateRole(role));
            }
            *slot = Some((source, net));
        }

        let mut nets = Vec::with_capacity(10);
        let mut sources = Vec::with_capacity(10);
        let mut missing = Vec::new();
        for (role, slot) in NetRole::ALL.into_iter().zip(slots) {
            match slot {
                Some((source, net)) => {
                    sources.push(source);
                    nets.push(net);
                }
                None => missing.push(role),
            }
        }

        if !missing.is_empty() {
            return Err(NetSetError::Incomplete(missing));
        }
        Ok(Self { nets, sources })
    }

    /// Switches every net of the set to the given forward activation.
    pub fn with_activation(self, activation: ActivationMode) -> Self {
        Self {
            nets: self
                .nets
                .into_iter()
                .map(|net| net.with_activation(activation))
                .collect(),
            sources: self.sources,
        }
    }

    pub fn get(&self, role: NetRole) -> &NeuralNet {
        &self.nets[role.index()]
    }

    /// Source of every net, in [`NetRole::ALL`] order.
    pub fn used_net_names(&self) -> &[String] {
        &self.sources
    }
}

fn resolve(root: &Path, relative: Vec<(NetRole, String)>) -> Vec<(NetRole, PathBuf)> {
    relative
        .into_iter()
        .map(|(role, path)| (role, root.join(path)))
        .collect()
}
