//! 视觉模式到系统指令的映射
//!
//! 新增模式只需要在 [`VISION_MODES`] 中加一行。

use std::fmt;

/// 未知或缺省模式使用的模式
const DEFAULT_MODE: &str = "scene";

/// navigate 模式未提供目标时的占位
pub const DEFAULT_TARGET: &str = "the target";

const TARGET_PLACEHOLDER: &str = "{target}";

/// 一个视觉模式及其指令模板，模板中的 `{target}` 会被替换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionMode {
    pub name: &'static str,
    pub template: &'static str,
}

pub const VISION_MODES: &[VisionMode] = &[
    VisionMode {
        name: "scene",
        template: "You are a visual assistant helping someone navigate. Describe the scene \
                   in two or three short sentences: what is directly ahead, the general layout, \
                   and anything that matters for moving safely.",
    },
    VisionMode {
        name: "emotion",
        template: "You are a visual assistant. Look at the people in the image and describe \
                   their likely facial expression and overall emotion in one or two short \
                   sentences. If no face is visible, say so.",
    },
    VisionMode {
        name: "navigate",
        template: "You are a visual assistant guiding someone toward {target}. Say where \
                   {target} is relative to the viewer and how to move toward it step by step \
                   (left, right, forward, distance), noting any obstacles on the way. If \
                   {target} is not visible, say so and suggest where to look.",
    },
    VisionMode {
        name: "objects",
        template: "You are a visual assistant. List the main objects in the image as a short \
                   list, each with its approximate position (left, center, right, near, far). \
                   Keep it under eight items.",
    },
];

impl VisionMode {
    /// 按名称查找（不区分大小写，忽略首尾空白）
    pub fn lookup(mode: &str) -> Option<&'static VisionMode> {
        let mode = mode.trim();
        VISION_MODES
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(mode))
    }

    /// 解析模式，缺省或未知时回退到 scene
    pub fn resolve(mode: Option<&str>) -> &'static VisionMode {
        mode.and_then(Self::lookup).unwrap_or_else(default_mode)
    }

    pub fn render(&self, target: Option<&str>) -> String {
        if !self.template.contains(TARGET_PLACEHOLDER) {
            return self.template.to_string();
        }
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TARGET);
        self.template.replace(TARGET_PLACEHOLDER, target)
    }
}

impl fmt::Display for VisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn default_mode() -> &'static VisionMode {
    VisionMode::lookup(DEFAULT_MODE).unwrap_or(&VISION_MODES[0])
}

/// 根据模式和目标生成系统指令
pub fn build_vision_prompt(mode: Option<&str>, target: Option<&str>) -> String {
    VisionMode::resolve(mode).render(target)
}

pub fn mode_names() -> impl Iterator<Item = &'static str> {
    VISION_MODES.iter().map(|m| m.name)
}
