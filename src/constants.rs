/// 校准所需帧数
pub const DEFAULT_CALIBRATION_FRAMES: usize = 30;

/// 人脸匹配相似度阈值（点积）
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.40;

/// 帧通道默认容量
pub const DEFAULT_FRAME_CHANNEL_CAPACITY: usize = 64;

/// 眨眼判定的 EAR 阈值
pub const DEFAULT_BLINK_EAR_THRESHOLD: f64 = 0.21;

/// 参考距离小于此值视为退化
pub const MIN_REFERENCE_DISTANCE: f64 = 1e-6;

/// 未匹配到图库时的主体名称
pub const UNKNOWN_SUBJECT: &str = "unknown";

pub const STATUS_CALIBRATING: &str = "Calibrating";
pub const STATUS_FOCUSED: &str = "Focused";
pub const STATUS_NO_STATUS: &str = "No Status";

pub const HEAD_POSE_DOWN: &str = "Head Down";
pub const HEAD_POSE_UP: &str = "Head Up";

pub const HEAD_TURN_LEFT: &str = "Turning LEFT";
pub const HEAD_TURN_RIGHT: &str = "Turning RIGHT";
pub const HEAD_TURN_FORWARD: &str = "Forward";

/// Condition names with fixed meaning for the `headPose` / `headTurn` fields.
pub const CONDITION_HEAD_DOWN: &str = "head_down";
pub const CONDITION_TURN_LEFT: &str = "turn_left";
pub const CONDITION_TURN_RIGHT: &str = "turn_right";
