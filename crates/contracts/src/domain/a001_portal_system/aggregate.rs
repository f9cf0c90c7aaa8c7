use serde::{Deserialize, Serialize};

/// Business area a portal system belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemCategory {
    Production,
    Service,
    Quality,
    Management,
    Monitoring,
    Analysis,
    Office,
}

impl SystemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemCategory::Production => "production",
            SystemCategory::Service => "service",
            SystemCategory::Quality => "quality",
            SystemCategory::Management => "management",
            SystemCategory::Monitoring => "monitoring",
            SystemCategory::Analysis => "analysis",
            SystemCategory::Office => "office",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SystemCategory::Production => "生产管理",
            SystemCategory::Service => "服务支持",
            SystemCategory::Quality => "质量控制",
            SystemCategory::Management => "经营管理",
            SystemCategory::Monitoring => "监测分析",
            SystemCategory::Analysis => "数据分析",
            SystemCategory::Office => "办公协同",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SystemCategory::Production => "#4CAF50",
            SystemCategory::Service => "#2196F3",
            SystemCategory::Quality => "#E91E63",
            SystemCategory::Management => "#9C27B0",
            SystemCategory::Monitoring => "#FF9800",
            SystemCategory::Analysis => "#607D8B",
            SystemCategory::Office => "#795548",
        }
    }

    pub fn all() -> [SystemCategory; 7] {
        [
            SystemCategory::Production,
            SystemCategory::Service,
            SystemCategory::Quality,
            SystemCategory::Management,
            SystemCategory::Monitoring,
            SystemCategory::Analysis,
            SystemCategory::Office,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Running,
    Maintenance,
    Offline,
}

impl SystemStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            SystemStatus::Running => "正常运行",
            SystemStatus::Maintenance => "维护中",
            SystemStatus::Offline => "已停用",
        }
    }
}

/// A tile on the portal page representing one internal business system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSystem {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Icon key resolved by the frontend icon set.
    pub icon: String,
    pub status: SystemStatus,
    /// `None` means the system has no web entry point yet.
    pub url: Option<String>,
    pub category: SystemCategory,
    pub favorited: bool,
}

impl PortalSystem {
    fn new(
        id: u32,
        name: &str,
        description: &str,
        icon: &str,
        category: SystemCategory,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            status: SystemStatus::Running,
            url: None,
            category,
            favorited: false,
        }
    }

    /// Case-insensitive match against name and description.
    /// An empty (or blank) query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Filter applied to the catalog on the portal page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemFilter {
    pub query: String,
    pub category: Option<SystemCategory>,
    pub favorites_only: bool,
}

impl SystemFilter {
    pub fn accepts(&self, system: &PortalSystem) -> bool {
        system.matches_query(&self.query)
            && self.category.map_or(true, |c| system.category == c)
            && (!self.favorites_only || system.favorited)
    }

    pub fn apply(&self, systems: &[PortalSystem]) -> Vec<PortalSystem> {
        systems.iter().filter(|s| self.accepts(s)).cloned().collect()
    }
}

/// Marks systems whose id is in `favorites`.
pub fn apply_favorites(systems: &mut [PortalSystem], favorites: &[u32]) {
    for system in systems.iter_mut() {
        system.favorited = favorites.contains(&system.id);
    }
}

/// Flips the favorite flag of one system and returns the new favorite id list.
pub fn toggle_favorite(systems: &mut [PortalSystem], id: u32) -> Vec<u32> {
    if let Some(system) = systems.iter_mut().find(|s| s.id == id) {
        system.favorited = !system.favorited;
    }
    systems.iter().filter(|s| s.favorited).map(|s| s.id).collect()
}

/// The built-in list of group systems shown on the portal.
pub fn default_catalog() -> Vec<PortalSystem> {
    use SystemCategory::*;
    vec![
        PortalSystem::new(1, "生产管理平台", "畜禽养殖生产过程监控、数据统计分析", "chart-area", Production),
        PortalSystem::new(2, "智慧养殖系统", "环境监控、自动投喂、健康管理", "home", Production),
        PortalSystem::new(3, "饲料管理系统", "饲料配方、库存管理、质量追溯", "seedling", Production),
        PortalSystem::new(4, "兽医服务平台", "动物健康监测、疫病防控、诊疗记录", "stethoscope", Service),
        PortalSystem::new(5, "智慧物流系统", "运输调度、路径优化、货物跟踪", "truck", Service),
        PortalSystem::new(6, "食品安全追溯", "从养殖到餐桌的全链条质量追溯", "shield", Quality),
        PortalSystem::new(7, "财务管理系统", "成本核算、收支管理、财务分析", "coins", Management),
        PortalSystem::new(8, "人力资源平台", "员工管理、考勤统计、薪酬计算", "users", Management),
        PortalSystem::new(9, "环保监测系统", "污染物监测、环保数据上报、治理效果", "leaf", Monitoring),
        PortalSystem::new(10, "BI数据分析", "数据可视化、经营分析、决策支持", "chart-pie", Analysis),
        PortalSystem::new(11, "采购管理平台", "供应商管理、采购流程、合同管理", "handshake", Management),
        PortalSystem::new(12, "移动办公OA", "审批流程、文档管理、移动办公", "smartphone", Office),
    ]
}
