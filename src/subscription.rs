//! 订阅值对象
//! 维护某个 client 以哪个 QoS 订阅了哪个 topic filter

use crate::topic::TopicFilter;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Empty client id")]
    EmptyClientId,
    #[error("Invalid QoS: {0}")]
    InvalidQoS(u8),
    #[error("Requested QoS is undefined")]
    UndefinedQos,
}

/// 服务质量
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[allow(clippy::enum_variant_names)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            n => Err(Error::InvalidQoS(n)),
        }
    }
}

/// 一条订阅记录，构造后不可变
///
/// 相等性和哈希只由 (client_id, topic_filter) 决定：
/// 同一个 client 重复订阅同一个 filter 视为同一条记录（重新订阅是替换，不是新增），
/// requested_qos 和 active 不参与比较
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawSubscription")]
pub struct Subscription {
    client_id: String,
    topic_filter: TopicFilter,
    /// 客户端可接受的最大 QoS，None 表示未指定
    requested_qos: Option<QoS>,
    active: bool,
}

/// 反序列化的原始形态，经过校验才能变成 [`Subscription`]
#[derive(serde::Deserialize)]
struct RawSubscription {
    client_id: String,
    topic_filter: TopicFilter,
    requested_qos: Option<QoS>,
    active: bool,
}

impl TryFrom<RawSubscription> for Subscription {
    type Error = Error;

    fn try_from(raw: RawSubscription) -> Result<Self, Self::Error> {
        if raw.client_id.is_empty() {
            return Err(Error::EmptyClientId);
        }
        Ok(Self {
            client_id: raw.client_id,
            topic_filter: raw.topic_filter,
            requested_qos: raw.requested_qos,
            active: raw.active,
        })
    }
}

impl Subscription {
    pub fn new(
        client_id: impl Into<String>,
        topic_filter: TopicFilter,
        requested_qos: Option<QoS>,
    ) -> Result<Self, Error> {
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(Error::EmptyClientId);
        }
        Ok(Self {
            client_id,
            topic_filter,
            requested_qos,
            active: true,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn topic_filter(&self) -> &TopicFilter {
        &self.topic_filter
    }

    pub fn requested_qos(&self) -> Option<QoS> {
        self.requested_qos
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 按 QoS 比较两条订阅
    /// 两边的 requested_qos 都必须已指定，否则返回 `UndefinedQos`
    pub fn qos_less_than(&self, other: &Subscription) -> Result<bool, Error> {
        match (self.requested_qos, other.requested_qos) {
            (Some(mine), Some(theirs)) => Ok(mine < theirs),
            _ => Err(Error::UndefinedQos),
        }
    }

    /// 聚合投递时使用的 QoS：未指定按最低档处理
    pub fn effective_qos(&self) -> QoS {
        self.requested_qos.unwrap_or(QoS::AtMostOnce)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id && self.topic_filter == other.topic_filter
    }
}

impl Eq for Subscription {}

impl std::hash::Hash for Subscription {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.client_id.hash(state);
        self.topic_filter.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    use super::*;

    fn sub(client_id: &str, filter: &str, qos: Option<QoS>) -> Subscription {
        Subscription::new(client_id, TopicFilter::parse(filter).unwrap(), qos).unwrap()
    }

    fn hash_of(sub: &Subscription) -> u64 {
        let mut hasher = DefaultHasher::new();
        sub.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn rejects_empty_client_id() {
        let filter = TopicFilter::parse("iot/#").unwrap();
        assert!(matches!(
            Subscription::new("", filter, Some(QoS::AtMostOnce)),
            Err(Error::EmptyClientId)
        ));
    }

    #[test]
    fn qos_from_byte() {
        assert_eq!(QoS::try_from(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(QoS::try_from(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(QoS::try_from(2).unwrap(), QoS::ExactlyOnce);
        assert!(matches!(QoS::try_from(3), Err(Error::InvalidQoS(3))));
    }

    #[test]
    fn equality_ignores_qos_and_active() {
        let a = sub("client-a", "iot/pid/#", Some(QoS::AtLeastOnce));
        let b = sub("client-a", "iot/pid/#", Some(QoS::ExactlyOnce));
        let c = sub("client-a", "iot/pid/#", None);
        let d = sub("client-b", "iot/pid/#", Some(QoS::AtLeastOnce));
        let e = sub("client-a", "iot/pid/+", Some(QoS::AtLeastOnce));

        // 自反、对称
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        // 传递
        assert_eq!(b, c);
        assert_eq!(a, c);
        // client 或 filter 不同则不等
        assert_ne!(a, d);
        assert_ne!(a, e);

        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn resubscribe_replaces_in_hash_set() {
        let mut set = HashSet::new();
        set.insert(sub("client-a", "iot/#", Some(QoS::AtLeastOnce)));
        let old = set.replace(sub("client-a", "iot/#", Some(QoS::ExactlyOnce)));

        assert_eq!(set.len(), 1);
        assert_eq!(old.unwrap().requested_qos(), Some(QoS::AtLeastOnce));
        let current = set.iter().next().unwrap();
        assert_eq!(current.requested_qos(), Some(QoS::ExactlyOnce));
    }

    #[test]
    fn qos_comparison_is_strict_order() {
        let q0 = sub("c", "iot/#", Some(QoS::AtMostOnce));
        let q1 = sub("c", "iot/#", Some(QoS::AtLeastOnce));
        let q2 = sub("c", "iot/#", Some(QoS::ExactlyOnce));

        assert!(q0.qos_less_than(&q1).unwrap());
        assert!(q1.qos_less_than(&q2).unwrap());
        assert!(q0.qos_less_than(&q2).unwrap());
        assert!(!q2.qos_less_than(&q0).unwrap());
        assert!(!q1.qos_less_than(&q1).unwrap());
    }

    #[test]
    fn qos_comparison_requires_defined_qos() {
        let unset = sub("c", "iot/#", None);
        let set = sub("c", "iot/#", Some(QoS::AtLeastOnce));

        assert!(matches!(
            unset.qos_less_than(&set),
            Err(Error::UndefinedQos)
        ));
        assert!(matches!(
            set.qos_less_than(&unset),
            Err(Error::UndefinedQos)
        ));
    }

    #[test]
    fn effective_qos_defaults_to_lowest() {
        assert_eq!(sub("c", "iot/#", None).effective_qos(), QoS::AtMostOnce);
        assert_eq!(
            sub("c", "iot/#", Some(QoS::ExactlyOnce)).effective_qos(),
            QoS::ExactlyOnce
        );
    }

    #[test]
    fn deserialize_revalidates_invariants() {
        let json =
            r#"{"client_id":"client-a","topic_filter":"iot/#","requested_qos":"AtLeastOnce","active":true}"#;
        let restored: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(restored, sub("client-a", "iot/#", Some(QoS::AtLeastOnce)));
        assert_eq!(restored.requested_qos(), Some(QoS::AtLeastOnce));
        assert!(restored.is_active());

        // 空 client_id 或非法 filter 不能绕过构造校验
        let empty_client =
            r#"{"client_id":"","topic_filter":"iot/#","requested_qos":null,"active":true}"#;
        assert!(serde_json::from_str::<Subscription>(empty_client).is_err());
        let bad_filter =
            r#"{"client_id":"client-a","topic_filter":"iot/#/dn","requested_qos":null,"active":true}"#;
        assert!(serde_json::from_str::<Subscription>(bad_filter).is_err());
    }

    #[test]
    fn clone_is_independent_value() {
        let original = sub("client-a", "iot/#", Some(QoS::AtLeastOnce));
        let copy = original.clone();

        assert_eq!(original, copy);
        assert_eq!(copy.requested_qos(), original.requested_qos());
        assert!(copy.is_active());
        drop(original);
        assert_eq!(copy.client_id(), "client-a");
    }
}
