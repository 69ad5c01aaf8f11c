//! 订阅注册表
//! 持有全部订阅记录（key = client_id + topic filter），并负责发布消息时的 filter 匹配

use std::{collections::HashMap, fmt::Debug};

use crate::{
    resolver,
    subscription::{QoS, Subscription},
    topic::{Level, TopicFilter},
};

/// 订阅树
/// 插入的每一条数据，分配一个唯一的 token 号，方便查询和删除
#[derive(Debug, serde::Serialize)]
pub struct SubscriptionTree<T: Debug> {
    /// 根节点，是个空节点
    root: SubscriptionNode<T>,
    token: u64,
}

impl<T: Debug> SubscriptionTree<T> {
    pub fn new() -> Self {
        Self {
            root: SubscriptionNode::empty(),
            token: 0,
        }
    }

    /// 插入一条订阅记录
    pub fn insert(&mut self, filter: &TopicFilter, data: T) -> u64 {
        let token = self.token;
        let mut current_node = &mut self.root;
        for level in filter.levels() {
            current_node = current_node
                .children
                .entry(level.as_str().to_owned())
                .or_insert_with(SubscriptionNode::empty);
        }
        current_node.data.insert(token, data);
        self.token += 1;

        token
    }

    /// 查找和发布消息的 topic 匹配的记录
    pub fn matches(&self, topic: &str) -> Vec<&T> {
        let mut matches = Vec::new();
        let mut topic_iter = topic.split('/');
        if topic.starts_with('$') {
            // $ 开头的 topic 第一层只走精确匹配，不暴露给通配符
            if let Some(first) = topic_iter.next() {
                if let Some(node) = self.root.children.get(first) {
                    node.matches(topic_iter, &mut matches);
                }
            }
        } else {
            self.root.matches(topic_iter, &mut matches);
        }

        matches
    }

    /// 删除一条订阅记录，返回对应的数据
    pub fn remove(&mut self, filter: &TopicFilter, token: u64) -> Option<T> {
        self.root
            .remove(filter.levels().iter().map(Level::as_str), token)
    }
}

impl<T: Debug> Default for SubscriptionTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 订阅树的节点
/// 每个客户端订阅的 filter 不固定，可能会挂在任何一个节点上
#[derive(Debug, serde::Serialize)]
struct SubscriptionNode<T: Debug> {
    /// 当前节点挂的数据，key = token
    data: HashMap<u64, T>,
    /// 子节点，key = filter 的一层（`+`、`#` 或具体片段）
    children: HashMap<String, SubscriptionNode<T>>,
}

impl<T: Debug> SubscriptionNode<T> {
    fn empty() -> Self {
        Self {
            data: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// 查找子树中和 topic 剩余层级匹配的 filter
    fn matches<'s, 'a, I>(&'s self, mut topic_iter: I, matches: &mut Vec<&'s T>)
    where
        I: Iterator<Item = &'a str> + Clone,
    {
        match topic_iter.next() {
            Some(path) => {
                for (key, node) in self.children.iter() {
                    match key.as_str() {
                        // # 匹配剩余的所有层级
                        "#" => matches.extend(node.data.values()),
                        "+" => node.matches(topic_iter.clone(), matches),
                        s if s == path => node.matches(topic_iter.clone(), matches),
                        _ => {}
                    }
                }
            }
            None => {
                // topic 层级走完了，当前节点的数据即为精确长度的匹配
                matches.extend(self.data.values());
                // a/# 也匹配 a 本身
                if let Some(node) = self.children.get("#") {
                    matches.extend(node.data.values());
                }
            }
        }
    }

    /// 删除子树中对应的订阅
    fn remove<'a, I>(&mut self, mut filter_iter: I, token: u64) -> Option<T>
    where
        I: Iterator<Item = &'a str>,
    {
        match filter_iter.next() {
            Some(path) => {
                let node = self.children.get_mut(path)?;
                let removed = node.remove(filter_iter, token);
                // 子节点成为空叶子后摘掉
                if node.children.is_empty() && node.data.is_empty() {
                    self.children.remove(path);
                }
                removed
            }
            None => self.data.remove(&token),
        }
    }
}

/// 订阅注册表，(client_id, topic filter) 对应唯一一条订阅
///
/// 并发控制由持有方负责：修改接口都是 `&mut self`，
/// 匹配结果是一次只读快照，交给 resolver 期间不可以有并发修改
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// 每个 client 持有的订阅，value = filter -> 订阅树 token
    clients: HashMap<String, HashMap<TopicFilter, u64>>,
    tree: SubscriptionTree<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一条订阅
    /// 同一个 client 对同一个 filter 重新订阅是替换，返回被替换的旧订阅
    pub fn subscribe(&mut self, subscription: Subscription) -> Option<Subscription> {
        let filters = self
            .clients
            .entry(subscription.client_id().to_owned())
            .or_default();
        let old_token = filters.remove(subscription.topic_filter());

        let token = self.tree.insert(subscription.topic_filter(), subscription.clone());
        filters.insert(subscription.topic_filter().clone(), token);

        let old = match old_token {
            Some(old_token) => self.tree.remove(subscription.topic_filter(), old_token),
            None => None,
        };
        match &old {
            Some(old) => log::debug!(
                "client {} resubscribe {}: qos {:?} -> {:?}",
                subscription.client_id(),
                subscription.topic_filter(),
                old.requested_qos(),
                subscription.requested_qos()
            ),
            None => log::debug!(
                "client {} subscribe {}",
                subscription.client_id(),
                subscription.topic_filter()
            ),
        }

        old
    }

    /// 取消一条订阅，返回被删除的订阅
    pub fn unsubscribe(
        &mut self,
        client_id: &str,
        filter: &TopicFilter,
    ) -> Option<Subscription> {
        let filters = self.clients.get_mut(client_id)?;
        let token = filters.remove(filter)?;
        if filters.is_empty() {
            self.clients.remove(client_id);
        }
        log::debug!("client {} unsubscribe {}", client_id, filter);

        self.tree.remove(filter, token)
    }

    /// 会话销毁时，删除 client 的全部订阅，返回删除条数
    pub fn remove_client(&mut self, client_id: &str) -> usize {
        let filters = match self.clients.remove(client_id) {
            Some(filters) => filters,
            None => return 0,
        };

        let mut removed = 0;
        for (filter, token) in filters {
            if self.tree.remove(&filter, token).is_some() {
                removed += 1;
            }
        }
        log::debug!("client {} removed, {} subscriptions dropped", client_id, removed);

        removed
    }

    /// 查找和 topic 匹配的全部活跃订阅
    /// 结果是只读快照，作为 resolver 的输入
    pub fn matches(&self, topic: &str) -> Vec<&Subscription> {
        self.tree
            .matches(topic)
            .into_iter()
            .filter(|s| s.is_active())
            .collect()
    }

    /// 对一个 topic 直接计算每个 client 的投递 QoS
    pub fn deliveries(&self, topic: &str) -> Result<HashMap<String, QoS>, resolver::Error> {
        resolver::resolve(self.matches(topic))
    }

    pub fn len(&self) -> usize {
        self.clients.values().map(|filters| filters.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
