//! 配置集合
//!
//! 持有所有活动的 [`WikiConfiguration`]。重新加载设置前会先释放全部旧配置，
//! 避免多次加载后监听器重复累积。

use crate::core::activity::NoticeSender;
use crate::core::settings::WikiSettings;
use crate::core::wiki::{WikiConfig, WikiConfiguration, WikiOptions};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct WikiHost {
    configurations: Vec<Arc<WikiConfiguration>>,
    options: Option<WikiOptions>,
    notices: Option<NoticeSender>,
}

impl WikiHost {
    /// 创建空集合
    ///
    /// # Arguments
    ///
    /// * `notices` - 所有配置共用的展示层通知通道
    pub fn new(notices: Option<NoticeSender>) -> Self {
        Self {
            configurations: Vec::new(),
            options: None,
            notices,
        }
    }

    /// 按设置重建所有配置（不启动监听）
    pub fn load(&mut self, settings: &WikiSettings) {
        self.dispose_all();
        self.configurations.clear();

        let options = settings.options(self.notices.clone());
        self.configurations = settings
            .configurations
            .iter()
            .cloned()
            .map(|config| Arc::new(WikiConfiguration::new(config, options.clone())))
            .collect();
        self.options = Some(options);
    }

    /// 重新加载设置并启动所有监听
    pub fn reload(&mut self, settings: &WikiSettings) {
        self.load(settings);
        self.start_all();
    }

    /// 启动所有监听
    ///
    /// # Returns
    ///
    /// 成功启动的数量
    pub fn start_all(&self) -> usize {
        self.configurations.iter().filter(|c| c.start()).count()
    }

    /// 添加配置，同名配置被释放并替换
    pub fn add(&mut self, config: WikiConfig) -> Arc<WikiConfiguration> {
        self.remove(&config.name);

        let options = self.options.get_or_insert_with(|| WikiOptions {
            notices: self.notices.clone(),
            ..WikiOptions::default()
        });
        let configuration = Arc::new(WikiConfiguration::new(config, options.clone()));
        self.configurations.push(configuration.clone());
        configuration
    }

    /// 移除并释放配置
    pub fn remove(&mut self, name: &str) -> bool {
        match self.configurations.iter().position(|c| c.name() == name) {
            Some(index) => {
                self.configurations.remove(index).dispose();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<WikiConfiguration>> {
        self.configurations.iter().find(|c| c.name() == name).cloned()
    }

    pub fn configurations(&self) -> &[Arc<WikiConfiguration>] {
        &self.configurations
    }

    /// 用于保存的配置记录
    pub fn records(&self) -> Vec<WikiConfig> {
        self.configurations.iter().map(|c| c.config().clone()).collect()
    }

    /// 释放所有配置的监听
    pub fn dispose_all(&self) {
        for configuration in &self.configurations {
            configuration.dispose();
        }
    }
}

impl Drop for WikiHost {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
