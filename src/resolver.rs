//! 投递决策聚合
//! 把匹配到某个 topic 的所有订阅压缩成每个 client 一条投递决策

use std::collections::HashMap;

use crate::subscription::{QoS, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 输入里出现了不满足构造校验的订阅
    /// [`Subscription::new`] 和反序列化都会拦住这种值，
    /// 留作对上游匹配结果的防御性校验
    #[error("Malformed subscription in match set")]
    MalformedSubscription,
}

/// 计算每个 client 的有效投递 QoS
///
/// 输入是匹配引擎筛选出的订阅集合，顺序无关。
/// 同一个 client 匹配到多条订阅时，取其中最高的 requested_qos；
/// 未指定 QoS 的订阅按最低档（QoS0）参与聚合。
pub fn resolve<'a, I>(matches: I) -> Result<HashMap<String, QoS>, Error>
where
    I: IntoIterator<Item = &'a Subscription>,
{
    let mut deliveries: HashMap<String, QoS> = HashMap::new();
    for sub in matches {
        // 上游匹配正确的话不会出现，防御性校验
        if sub.client_id().is_empty() {
            return Err(Error::MalformedSubscription);
        }

        let qos = sub.effective_qos();
        match deliveries.get_mut(sub.client_id()) {
            Some(current) if *current < qos => *current = qos,
            Some(_) => {}
            None => {
                deliveries.insert(sub.client_id().into(), qos);
            }
        }
    }

    Ok(deliveries)
}
