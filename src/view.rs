// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/view.rs - 页面路由与结果视图
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;

use tracing::warn;

use crate::report::DetectionReport;

/// 产品的页面路由。未匹配的路径落入 NotFound。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Home,
  Upload,
  Live,
  Results(String),
  Dashboard,
  About,
  NotFound(String),
}

impl Route {
  pub fn parse(path: &str) -> Route {
    let segments = path
      .split('/')
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>();
    match segments.as_slice() {
      [] => Route::Home,
      ["upload"] => Route::Upload,
      ["live"] => Route::Live,
      ["results", id] => Route::Results((*id).to_string()),
      ["dashboard"] => Route::Dashboard,
      ["about"] => Route::About,
      _ => Route::NotFound(path.to_string()),
    }
  }

  pub fn path(&self) -> String {
    match self {
      Route::Home => "/".to_string(),
      Route::Upload => "/upload".to_string(),
      Route::Live => "/live".to_string(),
      Route::Results(id) => format!("/results/{}", id),
      Route::Dashboard => "/dashboard".to_string(),
      Route::About => "/about".to_string(),
      Route::NotFound(path) => path.clone(),
    }
  }
}

/// 内存中的结果存放处。结果只在进程内传递，不落盘。
#[derive(Default)]
pub struct ResultStore {
  reports: HashMap<String, DetectionReport>,
}

impl ResultStore {
  pub fn new() -> Self {
    ResultStore::default()
  }

  /// 存入结果并返回其标识
  pub fn insert(&mut self, report: DetectionReport) -> String {
    let id = report.id.clone();
    self.reports.insert(id.clone(), report);
    id
  }

  pub fn get(&self, id: &str) -> Option<&DetectionReport> {
    self.reports.get(id)
  }

  pub fn len(&self) -> usize {
    self.reports.len()
  }

  pub fn is_empty(&self) -> bool {
    self.reports.is_empty()
  }
}

/// 结果页视图：找到了就展示，没找到给出回上传页的出口，
/// 不允许崩溃。
#[derive(Debug)]
pub enum ResultsView<'a> {
  Found(&'a DetectionReport),
  Missing { back_to: Route },
}

impl<'a> ResultsView<'a> {
  pub fn resolve(store: &'a ResultStore, id: &str) -> ResultsView<'a> {
    match store.get(id) {
      Some(report) => ResultsView::Found(report),
      None => {
        warn!("结果不存在: {}", id);
        ResultsView::Missing {
          back_to: Route::Upload,
        }
      }
    }
  }

  pub fn is_missing(&self) -> bool {
    matches!(self, ResultsView::Missing { .. })
  }

  /// 视图标题：结果页或 "Result Not Found" 回退
  pub fn title(&self) -> &'static str {
    match self {
      ResultsView::Found(_) => "Analysis Results",
      ResultsView::Missing { .. } => "Result Not Found",
    }
  }
}
