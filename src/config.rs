use std::path::{Path, PathBuf};

/// Viewer configuration - asset locations, camera parameters, and the name
/// contract for the paintable mesh.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base path all asset file names are resolved against.
    pub assets_dir: PathBuf,
    pub model_file: String,
    pub environment_file: String,
    /// Name of the mesh node the flag textures are applied to.
    pub flag_mesh_name: String,
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub exposure: f32,
    /// Show the environment map as the visible background.
    pub show_background: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            model_file: "PaisesBase.glb".to_string(),
            environment_file: "sky.hdr".to_string(),
            flag_mesh_name: "Bandera_Mesh".to_string(),
            fov_y_deg: 45.0,
            z_near: 0.1,
            z_far: 500.0,
            exposure: 1.1,
            show_background: true,
        }
    }
}

impl ViewerConfig {
    pub fn model_path(&self) -> PathBuf {
        self.assets_dir.join(&self.model_file)
    }

    pub fn environment_path(&self) -> PathBuf {
        self.assets_dir.join(&self.environment_file)
    }

    /// Resolve a catalog file name against the asset base path.
    pub fn flag_texture_path(&self, file_name: &str) -> PathBuf {
        self.assets_dir.join(file_name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    let json = std::fs::read_to_string(path)?;
    let config: ViewerConfig = serde_json::from_str(&json)?;
    Ok(config)
}

pub fn save_config(config: &ViewerConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_assets() {
        let config = ViewerConfig::default();
        assert_eq!(config.model_path(), PathBuf::from("assets/PaisesBase.glb"));
        assert_eq!(config.environment_path(), PathBuf::from("assets/sky.hdr"));
        assert_eq!(config.flag_mesh_name, "Bandera_Mesh");
        assert!(config.show_background);
    }

    #[test]
    fn flag_texture_resolves_under_assets_dir() {
        let config = ViewerConfig::default();
        assert_eq!(
            config.flag_texture_path("SpainFlag.jpg"),
            PathBuf::from("assets/SpainFlag.jpg")
        );
    }

    #[test]
    fn roundtrips_through_json() {
        let mut config = ViewerConfig::default();
        config.exposure = 0.9;
        config.flag_mesh_name = "Flag".to_string();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let loaded: ViewerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let loaded: ViewerConfig = serde_json::from_str(r#"{"exposure": 2.0}"#).unwrap();
        assert_eq!(loaded.exposure, 2.0);
        assert_eq!(loaded.model_file, "PaisesBase.glb");
    }
}
