// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 错误类型定义
/// Error taxonomy of the playback pipeline
///
/// 只有初始化错误 (PipelineError) 会返回给调用者;
/// 运行期错误 (读帧失败/单帧推理失败) 由各阶段记录日志后自行降级处理
use std::path::PathBuf;
use thiserror::Error;

/// 视频源错误
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("视频文件不存在: {}", .0.display())]
    NotFound(PathBuf),
    #[error("视频文件打开失败: {}: {}", .path.display(), .reason)]
    Unreadable { path: PathBuf, reason: String },
    #[error("读取视频帧失败: {0}")]
    Read(String),
}

/// 推理/标注错误
#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("模型文件不存在: {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("模型加载失败: {}: {}", .path.display(), .reason)]
    Load { path: PathBuf, reason: String },
    #[error("推理失败: {0}")]
    Inference(String),
    #[error("模型输出格式异常: {0}")]
    InvalidOutput(String),
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("配置项无效: {0}")]
    Invalid(String),
}

/// 流水线初始化错误 (FatalInit)
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Annotator(#[from] AnnotateError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("线程启动失败: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("{0}线程异常退出 (panic)")]
    WorkerPanicked(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_init_messages_are_single_line() {
        let errors: Vec<PipelineError> = vec![
            SourceError::NotFound(PathBuf::from("missing.mp4")).into(),
            SourceError::Unreadable {
                path: PathBuf::from("broken.mp4"),
                reason: "no video stream".to_string(),
            }
            .into(),
            AnnotateError::Load {
                path: PathBuf::from("yolov8n.onnx"),
                reason: "bad protobuf".to_string(),
            }
            .into(),
            ConfigError::Invalid("queue_capacity 必须大于0".to_string()).into(),
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(!msg.is_empty());
            assert!(!msg.contains('\n'), "多行错误信息: {msg}");
        }
    }

    #[test]
    fn test_source_error_mentions_path() {
        let err = SourceError::NotFound(PathBuf::from("clips/a.mp4"));
        assert!(err.to_string().contains("clips/a.mp4"));
    }
}
