//! Target Binding: host product, extension clone and loader engine of one run
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the loader-runner component shipped inside an engine directory
pub const RUNNER_COMPONENT: &str = "pyRevitRunner.dll";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProduct {
    /// Display name (ex: "Autodesk Revit 2019")
    pub name: String,
    /// Product year the manifest targets (ex: 2019)
    pub product_year: u32,
    /// Executable launched for playback
    pub launch_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionClone {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderEngine {
    /// Engine version (ex: 277)
    pub version: u32,
    /// Install location of the engine inside the clone
    pub path: PathBuf,
}

/// Everything a run needs to know about where it runs. Read-only for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBinding {
    pub product: HostProduct,
    pub clone: ExtensionClone,
    pub engine: LoaderEngine,
}

impl TargetBinding {
    pub fn new(product: HostProduct, clone: ExtensionClone, engine: LoaderEngine) -> Self {
        Self { product, clone, engine }
    }

    /// Path of the loader-runner component the manifest registers
    pub fn runner_component(&self) -> PathBuf {
        self.engine.path.join(RUNNER_COMPONENT)
    }

    pub fn launch_path(&self) -> &Path {
        &self.product.launch_path
    }
}

impl fmt::Display for HostProduct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.product_year)
    }
}

impl fmt::Display for ExtensionClone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.path.display())
    }
}
