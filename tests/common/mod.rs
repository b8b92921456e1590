//! 内存中的假门户，实现 `Session`，用于驱动整个批次流程

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use journal_autofill::error::{SessionError, SessionResult};
use journal_autofill::models::{JournalContent, PortalProfile, SchoolId, SubmissionTask};
use journal_autofill::{ElementRef, Found, Locator, RetryPolicy, Session, Timeouts};

pub const PORTAL_URL: &str = "https://portal.test/punch/Menu.jsp";
pub const FORM_URL: &str = "https://portal.test/punch/PunchList_A.jsp";
pub const USERNAME: &str = "4110000000";
pub const PASSWORD: &str = "secret";

/// 表单版面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// 有 id 的标准版面
    Standard,
    /// 没有 id，只能靠 name / 标签 / 元素类型找到
    Fallback,
}

/// 点击新增后门户的反应
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBehavior {
    /// 显示"新增完成"
    Confirm,
    /// 前 `times` 次点击时按钮已失效
    Transient { times: u32 },
    /// 没有任何讯息
    Silent,
    /// 显示"資料重複"
    Reject,
}

/// 点击新增当下的栏位值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRecord {
    pub date: String,
    pub identifier: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Blank,
    Login,
    Menu,
    Form,
}

struct State {
    layout: Layout,
    password: String,
    options: Vec<String>,
    page: Page,
    url: String,
    logged_in: bool,
    generation: u64,
    values: HashMap<&'static str, String>,
    messages: String,
    form_opens: usize,
    broken_opens: HashSet<usize>,
    behaviors: HashMap<(String, String), SubmitBehavior>,
    transient_seen: HashMap<(String, String), u32>,
    clicks: Vec<ClickRecord>,
    submit_clicks: usize,
    closes: usize,
}

/// 假门户，可复制；复制品共享同一份状态
#[derive(Clone)]
pub struct FakePortal {
    state: Arc<Mutex<State>>,
}

impl Default for FakePortal {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePortal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                layout: Layout::Standard,
                password: PASSWORD.to_string(),
                options: Vec::new(),
                page: Page::Blank,
                url: "about:blank".to_string(),
                logged_in: false,
                generation: 0,
                values: HashMap::new(),
                messages: String::new(),
                form_opens: 0,
                broken_opens: HashSet::new(),
                behaviors: HashMap::new(),
                transient_seen: HashMap::new(),
                clicks: Vec::new(),
                submit_clicks: 0,
                closes: 0,
            })),
        }
    }

    pub fn with_layout(self, layout: Layout) -> Self {
        self.state.lock().unwrap().layout = layout;
        self
    }

    pub fn with_password(self, password: &str) -> Self {
        self.state.lock().unwrap().password = password.to_string();
        self
    }

    /// 校内编号下拉选单的选项；空表示接受任何值
    pub fn with_options(self, options: &[&str]) -> Self {
        self.state.lock().unwrap().options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    /// 第 `n` 次开启表单网址时（从1开始）工作内容栏位不存在
    pub fn break_form_open(self, n: usize) -> Self {
        self.state.lock().unwrap().broken_opens.insert(n);
        self
    }

    /// `date` 为填入日期栏位的字串（民国格式）
    pub fn on_submit(self, date: &str, school_id: &str, behavior: SubmitBehavior) -> Self {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .insert((date.to_string(), school_id.to_string()), behavior);
        self
    }

    pub fn clicks(&self) -> Vec<ClickRecord> {
        self.state.lock().unwrap().clicks.clone()
    }

    /// 点击新增的次数（含按钮失效的点击）
    pub fn submit_clicks(&self) -> usize {
        self.state.lock().unwrap().submit_clicks
    }

    pub fn form_opens(&self) -> usize {
        self.state.lock().unwrap().form_opens
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

impl State {
    fn element(&self, name: &str) -> ElementRef {
        ElementRef::new(format!("{}:{}", self.generation, name))
    }

    fn found(&self, name: &str) -> SessionResult<Found> {
        Ok(Found {
            element: self.element(name),
            matches: 1,
            document_url: Some(self.url.clone()),
        })
    }

    /// 检查引用是否属于目前页面，回传元素名称
    fn resolve(&self, element: &ElementRef) -> SessionResult<String> {
        match element.id().split_once(':') {
            Some((gen, name)) if gen == self.generation.to_string() => Ok(name.to_string()),
            _ => Err(SessionError::StaleElement {
                reference: element.id().to_string(),
            }),
        }
    }

    fn navigate(&mut self, page: Page, url: &str) {
        self.page = page;
        self.url = url.to_string();
        self.generation += 1;
        self.values.clear();
        self.messages.clear();
    }

    fn form_is_broken(&self) -> bool {
        self.broken_opens.contains(&self.form_opens)
    }

    fn find_on_form(&self, locator: &Locator) -> Option<&'static str> {
        let css = match locator {
            Locator::Css(s) => s.as_str(),
            _ => return None,
        };
        let name = match (self.layout, css) {
            (Layout::Standard, "#date") => "date",
            (Layout::Standard, "#schno") => "identifier",
            (Layout::Standard, "#work") => "content",
            (Layout::Standard, "#btnSent") => "submit",
            (Layout::Fallback, "[name='date']") => "date",
            (Layout::Fallback, "select") => "identifier",
            (Layout::Fallback, "textarea") => "content",
            (Layout::Fallback, "input[value*='新增']") => "submit",
            _ => return None,
        };
        if name == "content" && self.form_is_broken() {
            return None;
        }
        Some(name)
    }

    fn try_login(&mut self) {
        let user = self.values.get("user").cloned().unwrap_or_default();
        let pwd = self.values.get("pwd").cloned().unwrap_or_default();
        if user == USERNAME && pwd == self.password {
            self.logged_in = true;
            self.navigate(Page::Menu, PORTAL_URL);
            self.messages = format!("歡迎 {} | 學習日誌 | 登出", user);
        } else {
            self.messages.push_str(" 密碼錯誤");
        }
    }

    fn submit(&mut self) -> SessionResult<()> {
        self.submit_clicks += 1;
        let date = self.values.get("date").cloned().unwrap_or_default();
        let identifier = self.values.get("identifier").cloned().unwrap_or_default();
        let key = (date.clone(), identifier.clone());
        let behavior = self
            .behaviors
            .get(&key)
            .copied()
            .unwrap_or(SubmitBehavior::Confirm);

        if let SubmitBehavior::Transient { times } = behavior {
            let seen = self.transient_seen.entry(key).or_insert(0);
            if *seen < times {
                *seen += 1;
                return Err(SessionError::StaleElement {
                    reference: format!("{}:submit", self.generation),
                });
            }
        }

        self.clicks.push(ClickRecord {
            date,
            identifier,
            content: self.values.get("content").cloned().unwrap_or_default(),
        });
        match behavior {
            SubmitBehavior::Confirm | SubmitBehavior::Transient { .. } => {
                self.messages.push_str(" 新增完成")
            }
            SubmitBehavior::Reject => self.messages.push_str(" 資料重複"),
            SubmitBehavior::Silent => {}
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakePortal {
    async fn open(&self, url: &str, _timeout: Duration) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        if url == PORTAL_URL {
            let page = if state.logged_in { Page::Menu } else { Page::Login };
            state.navigate(page, url);
            if page == Page::Menu {
                state.messages = format!("歡迎 {} | 學習日誌 | 登出", USERNAME);
            }
        } else if url == FORM_URL && state.logged_in {
            state.form_opens += 1;
            state.navigate(Page::Form, url);
        } else if url == FORM_URL {
            state.navigate(Page::Login, PORTAL_URL);
        } else {
            state.navigate(Page::Blank, url);
        }
        Ok(())
    }

    async fn find(&self, locator: &Locator, _timeout: Duration) -> SessionResult<Found> {
        let state = self.state.lock().unwrap();
        let not_found = || SessionError::ElementNotFound {
            locator: locator.clone(),
        };

        match state.page {
            Page::Login => match locator {
                Locator::Css(s) if s == "#txtLoginID" => state.found("user"),
                Locator::Css(s) if s == "#txtLoginPWD" => state.found("pwd"),
                Locator::Css(s) if s == "#button" => state.found("login"),
                _ => Err(not_found()),
            },
            Page::Menu => match locator {
                Locator::XPath(x) if x.contains("學習日誌") => state.found("journal-link"),
                _ => Err(not_found()),
            },
            Page::Form => match state.find_on_form(locator) {
                Some(name) => state.found(name),
                None => Err(not_found()),
            },
            Page::Blank => Err(not_found()),
        }
    }

    async fn set_value(
        &self,
        element: &ElementRef,
        text: &str,
        _timeout: Duration,
    ) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = state.resolve(element)?;
        let key: &'static str = match name.as_str() {
            "user" => "user",
            "pwd" => "pwd",
            "date" => "date",
            "identifier" => "identifier",
            "content" => "content",
            _ => {
                return Err(SessionError::NotInteractable {
                    locator: Locator::css(name),
                });
            }
        };
        if key == "identifier"
            && !state.options.is_empty()
            && !state.options.iter().any(|o| o == text)
        {
            return Err(SessionError::OptionMissing {
                value: text.to_string(),
                available: state.options.clone(),
            });
        }
        state.values.insert(key, text.to_string());
        Ok(())
    }

    async fn read_value(&self, element: &ElementRef, _timeout: Duration) -> SessionResult<String> {
        let state = self.state.lock().unwrap();
        let name = state.resolve(element)?;
        Ok(state
            .values
            .get(name.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, element: &ElementRef, _timeout: Duration) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = state.resolve(element)?;
        match name.as_str() {
            "login" => {
                state.try_login();
                Ok(())
            }
            "journal-link" => {
                state.navigate(Page::Form, FORM_URL);
                Ok(())
            }
            "submit" => state.submit(),
            _ => Ok(()),
        }
    }

    async fn press_enter(&self, element: &ElementRef, _timeout: Duration) -> SessionResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.resolve(element)? == "pwd" {
            state.try_login();
        }
        Ok(())
    }

    async fn current_url(&self, _timeout: Duration) -> SessionResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn page_text(&self, _timeout: Duration) -> SessionResult<String> {
        let state = self.state.lock().unwrap();
        let base = match state.page {
            Page::Blank => "",
            Page::Login => "校園入口 帳號 密碼",
            Page::Menu => "",
            Page::Form => "學習日誌 日期 校內編號 工作內容",
        };
        Ok(format!("{}{}", base, state.messages))
    }

    async fn close(&self) -> SessionResult<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn task(day: u32, id: &str) -> SubmissionTask {
    SubmissionTask::new(
        ymd(2024, 5, day),
        SchoolId::new(id),
        JournalContent::new("Lab work"),
    )
}

/// 不等待、不手动导航的设定档
pub fn profile() -> PortalProfile {
    let mut profile = PortalProfile::default();
    profile.navigation.manual_wait_secs = 0;
    profile
}

pub fn timeouts() -> Timeouts {
    Timeouts::immediate()
}

pub fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        pacing: Duration::ZERO,
        ..RetryPolicy::default()
    }
}
