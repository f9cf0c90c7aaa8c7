//! Page contract driven by the router, and the application's pages.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("页面初始化失败: {0}")]
    Init(String),

    #[error("页面渲染失败: {0}")]
    Render(String),
}

/// Lifecycle the router drives on every navigation.
pub trait PageComponent {
    type View;

    fn init(&mut self) -> Result<(), PageError>;

    fn render(&self) -> Result<Self::View, PageError>;

    fn destroy(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Portal,
    Assistant,
    MindMap,
    FloorPlan,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Portal => "神农集团数字化平台",
            Page::Assistant => "神农晓问 - AI智能助手",
            Page::MindMap => "思维导图工具",
            Page::FloorPlan => "平面图",
        }
    }

    /// Canonical path used by navigation links.
    pub fn path(&self) -> &'static str {
        match self {
            Page::Portal => "/",
            Page::Assistant => "/ai-assistant",
            Page::MindMap => "/mindmap",
            Page::FloorPlan => "/floorplan",
        }
    }

    /// Every registered path, aliases included.
    pub fn routes() -> [(&'static str, Page); 9] {
        [
            ("/", Page::Portal),
            ("/portal", Page::Portal),
            ("/home", Page::Portal),
            ("/ai-assistant", Page::Assistant),
            ("/ai", Page::Assistant),
            ("/mindmap", Page::MindMap),
            ("/mind", Page::MindMap),
            ("/floorplan", Page::FloorPlan),
            ("/floor", Page::FloorPlan),
        ]
    }

    pub fn nav_items() -> [Page; 4] {
        [Page::Portal, Page::Assistant, Page::MindMap, Page::FloorPlan]
    }
}

/// What the shell mounts for a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
    pub page: Page,
    pub title: &'static str,
}

impl PageComponent for Page {
    type View = PageView;

    fn init(&mut self) -> Result<(), PageError> {
        log::debug!("page {:?}: init", self);
        Ok(())
    }

    fn render(&self) -> Result<PageView, PageError> {
        Ok(PageView {
            page: *self,
            title: self.title(),
        })
    }

    fn destroy(&mut self) {
        log::debug!("page {:?}: destroy", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_routes_are_unique_and_canonical_paths_registered() {
        let routes = Page::routes();
        let paths: HashSet<&str> = routes.iter().map(|(p, _)| *p).collect();
        assert_eq!(paths.len(), routes.len());
        for page in Page::nav_items() {
            assert!(routes.contains(&(page.path(), page)));
        }
    }

    #[test]
    fn test_render_carries_title() {
        let mut page = Page::Assistant;
        page.init().unwrap();
        let view = page.render().unwrap();
        assert_eq!(view.page, Page::Assistant);
        assert_eq!(view.title, "神农晓问 - AI智能助手");
    }
}
