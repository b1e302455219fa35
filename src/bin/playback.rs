// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// YOLOv8 视频推理播放
///
/// 线程架构:
/// 1. 读帧线程:   FFmpeg解码本地视频
/// 2. 推理线程:   YOLOv8逐帧检测并绘制
/// 3. 显示循环:   状态叠加/按键控制 (流水线线程)
/// 4. 主线程:     macroquad窗口渲染
///
/// 运行: cargo run --features full --bin yolov8-playback --release -- --model-path yolov8n.onnx --video-path demo.mp4
/// 按键: q 退出 | 空格 暂停/继续 | + 加速 | - 减速
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::thread;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use yolov8_playback::detection::YoloV8Annotator;
use yolov8_playback::input::FfmpegSource;
use yolov8_playback::renderer::{load_font, run_window, window_conf, WindowSink};
use yolov8_playback::{DisplaySink, HeadlessSink, Pipeline, PipelineConfig, RunSummary};

/// 视频推理播放参数
#[derive(Parser, Debug)]
#[command(author, version, about = "YOLOv8 视频推理播放", long_about = None)]
struct Args {
    /// YOLO模型文件 (ONNX)
    #[arg(long, alias = "modelPath")]
    model_path: PathBuf,

    /// 视频文件
    #[arg(long, alias = "videoPath")]
    video_path: PathBuf,

    /// 流水线配置文件 (JSON), 文件不存在时使用默认配置
    #[arg(long)]
    config: Option<PathBuf>,

    /// 无窗口运行 (播放到视频结束)
    #[arg(long)]
    headless: bool,

    /// 窗口标题, 覆盖配置文件
    #[arg(long)]
    window_name: Option<String>,
}

/// 已完成初始化的播放器
struct Player {
    pipeline: Pipeline,
    source: FfmpegSource,
    annotator: YoloV8Annotator,
}

impl Player {
    fn build(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => PipelineConfig::load_or_default(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(name) = &args.window_name {
            config.window_name = name.clone();
        }
        config.log_summary();

        let font = load_font(config.font_path.as_deref());
        let pipeline = Pipeline::new(config)?;

        info!("📦 模型: {}", args.model_path.display());
        let annotator = YoloV8Annotator::load(&args.model_path, pipeline.config(), font)?;

        info!("📹 视频: {}", args.video_path.display());
        let source = FfmpegSource::open(&args.video_path)?;

        Ok(Self {
            pipeline,
            source,
            annotator,
        })
    }

    fn run<D: DisplaySink + ?Sized>(mut self, sink: &mut D) -> Result<RunSummary> {
        let summary = self
            .pipeline
            .run(&mut self.source, &mut self.annotator, sink)?;
        Ok(summary)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("yolov8_playback=info,ort=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn fail(e: anyhow::Error) -> ! {
    println!("[Error] {:#}", e);
    process::exit(1);
}

fn main() {
    let args = Args::parse();
    init_logging();

    let player = Player::build(&args).unwrap_or_else(|e| fail(e));
    info!("🚀 初始化完成, 开始播放");

    if args.headless {
        if let Err(e) = player.run(&mut HeadlessSink::new()) {
            fail(e);
        }
        return;
    }

    // macroquad 窗口必须在主线程, 流水线移到工作线程
    let title = player.pipeline.config().window_name.clone();
    let (sink, handle) = WindowSink::channel();
    let worker = thread::Builder::new()
        .name("pipeline".into())
        .spawn(move || {
            let mut sink = sink;
            player.run(&mut sink)
        })
        .unwrap_or_else(|e| fail(e.into()));

    macroquad::Window::from_config(window_conf(&title), async move {
        run_window(handle).await;
        let code = match worker.join() {
            Ok(Ok(_)) => 0,
            Ok(Err(e)) => {
                println!("[Error] {:#}", e);
                1
            }
            Err(_) => {
                error!("❌ 流水线线程panic");
                1
            }
        };
        process::exit(code);
    });
}
