// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod args;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use shouyu::classifier::LetterClassifier;
use shouyu::config::AppConfig;
use shouyu::detector::{DetectorConfig, OnnxHandDetector};
use shouyu::input::{InputSourceType, create_input_source};
use shouyu::output::create_output_writer;
use shouyu::pipeline::{DecisionStatus, Pipeline};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  // 加载配置并应用命令行覆盖
  let mut config = match &args.config {
    Some(path) => AppConfig::from_file(path)?,
    None => AppConfig::default(),
  };
  if let Some(path) = &args.detector_model {
    config.detector_model = path.clone();
  }
  if let Some(path) = &args.classifier_model {
    config.classifier_model = path.clone();
  }
  if let Some(path) = &args.labels {
    config.labels_path = path.clone();
  }
  if let Some(threshold) = args.detection_confidence {
    config.detection_confidence = threshold;
  }
  if let Some(threshold) = args.classify_confidence {
    config.classify_confidence = threshold;
  }

  info!("手部关键点模型: {}", config.detector_model);
  info!("字母分类模型: {}", config.classifier_model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("检测阈值: {:.2}, 分类阈值: {:.2}", config.detection_confidence, config.classify_confidence);

  // 组装管线，构造失败在首帧之前暴露
  info!("正在加载模型...");
  let detector = OnnxHandDetector::load(
    &config.detector_model,
    DetectorConfig::from_app_config(&config),
  )?;
  let classifier = LetterClassifier::load(
    &config.classifier_model,
    &config.labels_path,
    config.classify_confidence,
  )?;
  let mut pipeline = Pipeline::new(Box::new(detector), classifier, config.bbox_padding);
  info!("模型加载完成");

  // 创建输入源
  let mut input_source =
    create_input_source(&args.input, config.camera_width, config.camera_height)?;
  info!(
    "输入源已打开: {}x{} {}",
    input_source.width(),
    input_source.height(),
    match input_source.source_type() {
      InputSourceType::Image => "图片",
      InputSourceType::V4l2 => "V4L2 摄像头",
    }
  );

  // 创建输出写入器
  let mut output_writer = create_output_writer(&args.output, &args.font)?;
  info!("输出已创建");

  // Ctrl-C 退出帧循环
  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .expect("无法设置 Ctrl-C 处理器");

  info!("开始处理...");
  let mut frame_count = 0u64;
  let mut confident_count = 0u64;

  while let Some(frame_result) = input_source.next() {
    let frame = frame_result?;

    if args.max_frames > 0 && frame_count >= args.max_frames {
      info!("已达到最大帧数限制: {}", args.max_frames);
      break;
    }

    let decision = pipeline.process_frame(&frame.image);
    match decision.status {
      DecisionStatus::Confident => {
        confident_count += 1;
        info!(
          "帧 {} (时间: {}ms): {} ({:.1}%)",
          frame.index,
          frame.timestamp_ms,
          decision.letter.as_deref().unwrap_or("-"),
          decision.confidence * 100.0
        );
      }
      DecisionStatus::LowConfidence => {
        info!("帧 {} (时间: {}ms): {}", frame.index, frame.timestamp_ms, decision.message);
      }
      DecisionStatus::NoHand => {}
      DecisionStatus::ClassificationError => {
        warn!("帧 {}: {}", frame.index, decision.message);
      }
    }

    output_writer.write_frame(&frame.image, &decision)?;
    frame_count += 1;

    if rx.try_recv().is_ok() {
      warn!("中断信号接收，退出帧循环");
      break;
    }
  }

  output_writer.finish()?;

  let status = pipeline.status();
  info!("处理完成!");
  info!("总帧数: {}", frame_count);
  info!("置信预测帧数: {}", confident_count);
  if let Some(letter) = status.last_letter {
    info!("最后预测: {} ({:.1}%)", letter, status.last_confidence * 100.0);
  }

  Ok(())
}
