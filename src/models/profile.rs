//! 门户设定档：所有选择器与判定关键字
//!
//! 策略是数据而不是分支程式，新增备援策略只需修改设定档。
//! 预设值对应兴大学习日志系统（EZ-Come）。

use serde::{Deserialize, Serialize};

use crate::models::DateFormat;
use crate::session::Locator;

/// 同一个定位方式匹配到多个元素时如何处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    /// 只接受唯一匹配，多个视为找不到
    #[default]
    Unique,
    /// 取第一个
    First,
}

/// 单一定位策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(flatten)]
    pub locator: Locator,
    #[serde(default)]
    pub pick: Pick,
}

impl Strategy {
    pub fn unique(locator: Locator) -> Self {
        Self {
            locator,
            pick: Pick::Unique,
        }
    }

    pub fn first(locator: Locator) -> Self {
        Self {
            locator,
            pick: Pick::First,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalProfile {
    pub login: LoginProfile,
    pub navigation: NavigationProfile,
    pub form: FormProfile,
    pub confirmation: ConfirmationProfile,
    pub date_format: DateFormat,
}

impl Default for PortalProfile {
    fn default() -> Self {
        Self {
            login: LoginProfile::default(),
            navigation: NavigationProfile::default(),
            form: FormProfile::default(),
            confirmation: ConfirmationProfile::default(),
            date_format: DateFormat::Roc,
        }
    }
}

/// 登入页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginProfile {
    pub username: Vec<Strategy>,
    pub password: Vec<Strategy>,
    pub submit: Vec<Strategy>,
    /// 登入成功后页面会出现的文字（帐号本身也会加入判定）
    pub success_markers: Vec<String>,
    pub failure_markers: Vec<String>,
}

impl Default for LoginProfile {
    fn default() -> Self {
        Self {
            username: vec![
                Strategy::first(Locator::css("#txtLoginID")),
                Strategy::first(Locator::css("[name='txtLoginID']")),
            ],
            password: vec![
                Strategy::first(Locator::css("#txtLoginPWD")),
                Strategy::first(Locator::css("[name='txtLoginPWD']")),
            ],
            submit: vec![
                Strategy::first(Locator::css("#button")),
                Strategy::first(Locator::css("input[value='登入']")),
            ],
            success_markers: strings(&["登出", "logout"]),
            failure_markers: strings(&["密碼錯誤", "帳號或密碼", "登入失敗"]),
        }
    }
}

/// 从选单到学习日志页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationProfile {
    pub links: Vec<Strategy>,
    /// 直接存取的路径，接在入口网址的 origin 之后
    pub direct_paths: Vec<String>,
    /// 自动导航都失败时，等待操作者手动点击的秒数；0 表示不等待
    pub manual_wait_secs: u64,
}

impl Default for NavigationProfile {
    fn default() -> Self {
        Self {
            links: vec![
                Strategy::first(Locator::xpath("//a[contains(text(), '學習日誌')]")),
                Strategy::first(Locator::xpath("//a[contains(text(), '日誌')]")),
                Strategy::first(Locator::xpath("//a[contains(@href, 'PunchList_A')]")),
            ],
            direct_paths: strings(&[
                "/punch/PunchList_A.jsp",
                "/PunchList_A.jsp",
                "/punch/journal.jsp",
                "/journal.jsp",
            ]),
            manual_wait_secs: 10,
        }
    }
}

/// 日志表单的四个栏位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormProfile {
    pub date: Vec<Strategy>,
    pub identifier: Vec<Strategy>,
    pub content: Vec<Strategy>,
    pub submit: Vec<Strategy>,
}

impl Default for FormProfile {
    fn default() -> Self {
        Self {
            date: vec![
                Strategy::first(Locator::css("#date")),
                Strategy::first(Locator::css("[name='date']")),
                Strategy::unique(Locator::css("input[placeholder*='民國yyymmdd']")),
            ],
            identifier: vec![
                Strategy::first(Locator::css("#schno")),
                Strategy::first(Locator::css("[name='schno']")),
                Strategy::unique(Locator::css("select")),
                Strategy::unique(Locator::label("校內編號")),
            ],
            content: vec![
                Strategy::first(Locator::css("#work")),
                Strategy::first(Locator::css("[name='work']")),
                // 门户原始码中的拼写就是 "ture"
                Strategy::unique(Locator::css("input[required='ture']:not(#date)")),
                Strategy::unique(Locator::css("textarea")),
            ],
            submit: vec![
                Strategy::first(Locator::css("#btnSent")),
                Strategy::first(Locator::css("[name='btnSent']")),
                Strategy::unique(Locator::css("input[value*='新增']")),
                Strategy::unique(Locator::css("input[onclick*='add']")),
                Strategy::unique(Locator::xpath("//button[contains(., '新增')]")),
            ],
        }
    }
}

/// 提交后的判定关键字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationProfile {
    pub success_markers: Vec<String>,
    pub failure_markers: Vec<String>,
}

impl Default for ConfirmationProfile {
    fn default() -> Self {
        Self {
            success_markers: strings(&["新增完成", "儲存成功", "成功", "完成", "success"]),
            failure_markers: strings(&["錯誤", "失敗", "重複", "已存在", "error"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_toml_shape() {
        let form: FormProfile = toml::from_str(
            r##"
            date = [{ by = "css", value = "#day" }]
            submit = [{ by = "xpath", value = "//input[@type='submit']", pick = "first" }]
            "##,
        )
        .unwrap();

        assert_eq!(form.date, vec![Strategy::unique(Locator::css("#day"))]);
        assert_eq!(form.submit[0].pick, Pick::First);
        // 未指定的栏位沿用预设
        assert_eq!(form.content, FormProfile::default().content);
    }

    #[test]
    fn test_every_role_has_a_fallback() {
        let form = FormProfile::default();
        for strategies in [&form.date, &form.identifier, &form.content, &form.submit] {
            assert!(strategies.len() >= 2);
        }
    }
}
