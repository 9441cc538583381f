//! Configuration – reads/writes `~/.gesture-grip/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use grip_motion::{Easing, JointRange, MotionConfig};
use grip_runtime::{
    ControllerConfig, DispatcherConfig, JointSpec, ModeSettings, StabilizerConfig,
};
use grip_types::{GripError, Rgb};
use serde::{Deserialize, Serialize};

/// One `[[joints]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub label: String,
    pub min: i32,
    pub max: i32,
    pub upright: i32,
    pub downward: i32,
    #[serde(default)]
    pub settle_ms: u64,
    /// Indicator colour as `[r, g, b]`.
    #[serde(default = "default_joint_color")]
    pub color: [u8; 3],
}

impl JointConfig {
    fn new(label: &str, (min, max): (i32, i32), upright: i32, downward: i32, settle_ms: u64, color: [u8; 3]) -> Self {
        Self {
            label: label.to_string(),
            min,
            max,
            upright,
            downward,
            settle_ms,
            color,
        }
    }
}

fn default_joint_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_joints() -> Vec<JointConfig> {
    vec![
        JointConfig::new("BASE", (20, 80), 50, 75, 300, [150, 0, 255]),
        JointConfig::new("MIDDLE", (0, 80), 60, 100, 300, [50, 232, 133]),
        JointConfig::new("CROSS", (0, 180), 90, 0, 200, [255, 190, 0]),
        JointConfig::new("LEFT", (0, 170), 85, 0, 50, [0, 0, 255]),
        JointConfig::new("RIGHT", (0, 170), 85, 0, 0, [255, 0, 0]),
    ]
}

/// `[timing]` – every value in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub receive_timeout_ms: u64,
    pub consumer_interval_ms: u64,
    pub step_interval_ms: u64,
    pub lock_active_ms: u64,
    pub lock_idle_ms: u64,
    pub feedback_interval_ms: u64,
    pub blink_interval_ms: u64,
    pub warmup_ms: u64,
    pub power_settle_ms: u64,
    pub dispatch_delay_ms: u64,
    pub posture_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            poll_interval_ms: 20,
            receive_timeout_ms: 10,
            consumer_interval_ms: 20,
            step_interval_ms: 20,
            lock_active_ms: 100,
            lock_idle_ms: 500,
            feedback_interval_ms: 50,
            blink_interval_ms: 500,
            warmup_ms: 1000,
            power_settle_ms: 500,
            dispatch_delay_ms: 2000,
            posture_timeout_ms: 8000,
        }
    }
}

/// `[motion]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub deadzone_deg: i32,
    pub jitter_deg: i32,
    pub adjust_step_deg: i32,
    pub startup_steps_per_degree: u32,
    pub direct_steps_per_degree: u32,
    pub easing: Easing,
    pub attach_retries: u32,
    pub brightness: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            deadzone_deg: 5,
            jitter_deg: 3,
            adjust_step_deg: 5,
            startup_steps_per_degree: 3,
            direct_steps_per_degree: 1,
            easing: Easing::Cos,
            attach_retries: 3,
            brightness: 0.3,
        }
    }
}

/// Persisted configuration stored in `~/.gesture-grip/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GripConfig {
    #[serde(default = "default_joints")]
    pub joints: Vec<JointConfig>,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub motion: MotionSettings,
}

impl Default for GripConfig {
    fn default() -> Self {
        Self {
            joints: default_joints(),
            timing: TimingConfig::default(),
            motion: MotionSettings::default(),
        }
    }
}

const STEPS_PER_DEGREE: std::ops::RangeInclusive<u32> = 1..=100;

impl GripConfig {
    /// Convert into the runtime's [`ControllerConfig`].
    ///
    /// # Errors
    ///
    /// [`GripError::Config`] if there are no joints, a joint range is
    /// invalid or a steps-per-degree setting is outside 1..=100.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, GripError> {
        if self.joints.is_empty() {
            return Err(GripError::Config("at least one joint is required".to_string()));
        }
        let ms = Duration::from_millis;
        let t = &self.timing;
        let m = &self.motion;

        for (key, value) in [
            ("startup_steps_per_degree", m.startup_steps_per_degree),
            ("direct_steps_per_degree", m.direct_steps_per_degree),
        ] {
            if !STEPS_PER_DEGREE.contains(&value) {
                return Err(GripError::Config(format!(
                    "{key} must be within {}..={}, got {value}",
                    STEPS_PER_DEGREE.start(),
                    STEPS_PER_DEGREE.end()
                )));
            }
        }

        let joints = self
            .joints
            .iter()
            .map(|j| {
                let range = JointRange::new(j.min, j.max)
                    .map_err(|e| GripError::Config(format!("joint {}: {e}", j.label)))?;
                let [r, g, b] = j.color;
                Ok(JointSpec {
                    label: j.label.clone(),
                    range,
                    upright_deg: j.upright,
                    downward_deg: j.downward,
                    settle: ms(j.settle_ms),
                    color: Rgb::new(r, g, b),
                })
            })
            .collect::<Result<Vec<_>, GripError>>()?;

        Ok(ControllerConfig {
            joints,
            motion: MotionConfig {
                deadzone_deg: m.deadzone_deg,
                jitter_deg: m.jitter_deg,
                step_interval: ms(t.step_interval_ms),
                ..MotionConfig::default()
            },
            mode: ModeSettings {
                adjust_step_deg: m.adjust_step_deg,
                posture_easing: m.easing,
                posture_steps_per_degree: m.direct_steps_per_degree,
                receive_timeout: ms(t.receive_timeout_ms),
                consumer_interval: ms(t.consumer_interval_ms),
                ..ModeSettings::default()
            },
            dispatcher: DispatcherConfig {
                poll_interval: ms(t.poll_interval_ms),
                debounce: ms(t.debounce_ms),
                start_delay: ms(t.dispatch_delay_ms),
            },
            stabilizer: StabilizerConfig {
                active_interval: ms(t.lock_active_ms),
                idle_interval: ms(t.lock_idle_ms),
            },
            feedback_interval: ms(t.feedback_interval_ms),
            blink_interval: ms(t.blink_interval_ms),
            brightness: m.brightness,
            attach_retries: m.attach_retries,
            power_settle: ms(t.power_settle_ms),
            startup_steps_per_degree: m.startup_steps_per_degree,
            posture_timeout: ms(t.posture_timeout_ms),
            warmup: ms(t.warmup_ms),
            ..ControllerConfig::default()
        })
    }
}

/// Path of the config file: `$GRIP_CONFIG`, else `~/.gesture-grip/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("GRIP_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".gesture-grip").join("config.toml")
}

/// Load the config (or the defaults when no file exists) and apply
/// environment overrides.
pub fn load_or_default() -> Result<GripConfig, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<GripConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: GripConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `GRIP_*` environment variable overrides to `cfg`.  Values that do
/// not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `GRIP_DEBOUNCE_MS` | `timing.debounce_ms` |
/// | `GRIP_POLL_INTERVAL_MS` | `timing.poll_interval_ms` |
/// | `GRIP_ADJUST_STEP_DEG` | `motion.adjust_step_deg` |
pub fn apply_env_overrides(cfg: &mut GripConfig) {
    if let Some(v) = env_parse::<u64>("GRIP_DEBOUNCE_MS") {
        cfg.timing.debounce_ms = v;
    }
    if let Some(v) = env_parse::<u64>("GRIP_POLL_INTERVAL_MS") {
        cfg.timing.poll_interval_ms = v;
    }
    if let Some(v) = env_parse::<i32>("GRIP_ADJUST_STEP_DEG") {
        cfg.motion.adjust_step_deg = v;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Save the config to `config_path()`.
pub fn save(cfg: &GripConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &GripConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_five_joint_arm() {
        let cfg = GripConfig::default();
        let labels: Vec<&str> = cfg.joints.iter().map(|j| j.label.as_str()).collect();
        assert_eq!(labels, ["BASE", "MIDDLE", "CROSS", "LEFT", "RIGHT"]);
        assert_eq!(cfg.timing.debounce_ms, 1000);
        assert_eq!(cfg.motion.adjust_step_deg, 5);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = GripConfig::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timing]\ndebounce_ms = 750\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.timing.debounce_ms, 750);
        assert_eq!(loaded.timing.poll_interval_ms, 20);
        assert_eq!(loaded.joints.len(), 5);
        assert_eq!(loaded.motion.easing, Easing::Cos);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timing = 3").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&GripConfig::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn config_path_points_to_grip_dir() {
        let p = config_path_for_home("/home/operator");
        assert!(p.to_string_lossy().contains(".gesture-grip"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_debounce() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("GRIP_DEBOUNCE_MS", "1500") };
        let mut cfg = GripConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.timing.debounce_ms, 1500);
        unsafe { std::env::remove_var("GRIP_DEBOUNCE_MS") };
    }

    #[test]
    fn apply_env_overrides_changes_poll_interval() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("GRIP_POLL_INTERVAL_MS", "40") };
        let mut cfg = GripConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.timing.poll_interval_ms, 40);
        unsafe { std::env::remove_var("GRIP_POLL_INTERVAL_MS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_step() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("GRIP_ADJUST_STEP_DEG", "five") };
        let mut cfg = GripConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.motion.adjust_step_deg, 5);
        unsafe { std::env::remove_var("GRIP_ADJUST_STEP_DEG") };
    }

    #[test]
    fn converts_to_controller_config() {
        let mut cfg = GripConfig::default();
        cfg.timing.dispatch_delay_ms = 0;
        let cc = cfg.to_controller_config().unwrap();
        assert_eq!(cc.joints.len(), 5);
        assert_eq!(cc.joints[0].range, JointRange { min: 20, max: 80 });
        assert_eq!(cc.joints[1].color, Rgb::new(50, 232, 133));
        assert_eq!(cc.dispatcher.debounce, Duration::from_millis(1000));
        assert!(cc.dispatcher.start_delay.is_zero());
        assert_eq!(cc.mode.adjust_step_deg, 5);
    }

    #[test]
    fn invalid_joint_range_is_rejected() {
        let mut cfg = GripConfig::default();
        cfg.joints[0].min = 90;
        cfg.joints[0].max = 10;
        assert!(matches!(cfg.to_controller_config(), Err(GripError::Config(_))));

        cfg.joints.clear();
        assert!(matches!(cfg.to_controller_config(), Err(GripError::Config(_))));
    }

    #[test]
    fn out_of_range_steps_per_degree_is_rejected() {
        let mut cfg = GripConfig::default();
        cfg.motion.direct_steps_per_degree = 0;
        assert!(matches!(cfg.to_controller_config(), Err(GripError::Config(_))));

        let mut cfg = GripConfig::default();
        cfg.motion.startup_steps_per_degree = u32::MAX;
        let err = cfg.to_controller_config().unwrap_err();
        assert!(err.to_string().contains("startup_steps_per_degree"));

        let mut cfg = GripConfig::default();
        cfg.motion.direct_steps_per_degree = 100;
        assert!(cfg.to_controller_config().is_ok());
    }
}
