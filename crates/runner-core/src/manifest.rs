//! Loader registration manifest (`.addin`) scoped to one run's working directory
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RunnerError;

pub const MANIFEST_FILE_NAME: &str = "PyRevitRunner.addin";
pub const RUNNER_DISPLAY_NAME: &str = "pyRevitRunner";
pub const RUNNER_ADDIN_ID: &str = "D49D3677-61C4-47A8-BFFF-49E6616D54C1";
pub const RUNNER_ENTRY_POINT: &str = "PyRevitRunner.PyRevitRunnerApplication";
pub const DEFAULT_VENDOR_ID: &str = "eirannejad";

const MANIFEST_TEMPLATE_NAME: &str = "addin";

const MANIFEST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<!-- Revit {{product_year}} -->
<RevitAddIns>
  <AddIn Type="Application">
    <Name>{{display_name}}</Name>
    <Assembly>{{assembly}}</Assembly>
    <AddInId>{{addin_id}}</AddInId>
    <FullClassName>{{full_class_name}}</FullClassName>
    <VendorId>{{vendor_id}}</VendorId>
  </AddIn>
</RevitAddIns>
"#;

static MANIFEST_REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    let _ = handlebars.register_template_string(MANIFEST_TEMPLATE_NAME, MANIFEST_TEMPLATE);
    handlebars
});

/// Values of one add-in registration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub product_year: u32,
    pub file_name: String,
    pub display_name: String,
    /// Loader-runner component the host loads
    pub assembly: String,
    pub addin_id: String,
    pub full_class_name: String,
    pub vendor_id: String,
    /// Directory the manifest is written to and the host discovers it from
    pub search_scope: PathBuf,
}

impl ManifestRecord {
    /// The runner registration for one working directory
    pub fn runner(
        product_year: u32,
        runner_component: &Path,
        vendor_id: &str,
        search_scope: &Path,
    ) -> Self {
        Self {
            product_year,
            file_name: MANIFEST_FILE_NAME.to_string(),
            display_name: RUNNER_DISPLAY_NAME.to_string(),
            assembly: runner_component.display().to_string(),
            addin_id: RUNNER_ADDIN_ID.to_string(),
            full_class_name: RUNNER_ENTRY_POINT.to_string(),
            vendor_id: vendor_id.to_string(),
            search_scope: search_scope.to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.search_scope.join(&self.file_name)
    }

    pub fn render(&self) -> Result<String, RunnerError> {
        MANIFEST_REGISTRY
            .render(MANIFEST_TEMPLATE_NAME, self)
            .map_err(|e| RunnerError::Template(e.to_string()))
    }

    /// Render and write the manifest into its search scope
    pub fn write(&self) -> Result<PathBuf, RunnerError> {
        let path = self.path();
        let content = self.render()?;
        fs::write(&path, content).map_err(|source| RunnerError::FileWriteFailed {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
