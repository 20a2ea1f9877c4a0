// admission.rs - Connection admission control
//
// Caps the number of concurrent sessions overall and per source address.
// A slot is held by an `AdmissionGuard` and released when the guard drops.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use thiserror::Error;

/// The 14th concurrent client is turned away.
pub const DEFAULT_MAX_CLIENTS: usize = 13;
/// The 4th concurrent connection from one address is turned away.
pub const DEFAULT_MAX_PER_ADDRESS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("We already have too many clients active.")]
    ServerFull { limit: usize },

    #[error("We already have too many concurrent connections from your IP address ({address}).")]
    TooManyFromAddress { address: IpAddr, limit: usize },
}

#[derive(Debug, Default)]
struct Slots {
    total: usize,
    per_address: HashMap<IpAddr, usize>,
}

#[derive(Debug, Clone)]
pub struct Admission {
    slots: Arc<Mutex<Slots>>,
    max_total: usize,
    max_per_address: usize,
}

impl Default for Admission {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLIENTS, DEFAULT_MAX_PER_ADDRESS)
    }
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Admission {
    pub fn new(max_total: usize, max_per_address: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            max_total,
            max_per_address,
        }
    }

    pub fn try_admit(&self, address: IpAddr) -> Result<AdmissionGuard, Rejection> {
        let mut slots = lock(&self.slots);

        if slots.total >= self.max_total {
            return Err(Rejection::ServerFull {
                limit: self.max_total,
            });
        }
        let from_address = slots.per_address.get(&address).copied().unwrap_or(0);
        if from_address >= self.max_per_address {
            return Err(Rejection::TooManyFromAddress {
                address,
                limit: self.max_per_address,
            });
        }

        slots.total += 1;
        *slots.per_address.entry(address).or_insert(0) += 1;

        Ok(AdmissionGuard {
            slots: Arc::downgrade(&self.slots),
            address,
        })
    }

    pub fn active(&self) -> usize {
        lock(&self.slots).total
    }

    pub fn active_from(&self, address: IpAddr) -> usize {
        lock(&self.slots)
            .per_address
            .get(&address)
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct AdmissionGuard {
    slots: Weak<Mutex<Slots>>,
    address: IpAddr,
}

impl AdmissionGuard {
    pub fn address(&self) -> IpAddr {
        self.address
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            let mut slots = lock(&slots);
            slots.total = slots.total.saturating_sub(1);
            if let Some(count) = slots.per_address.get_mut(&self.address) {
                *count -= 1;
                if *count == 0 {
                    slots.per_address.remove(&self.address);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_total_limit() {
        let admission = Admission::new(2, 5);
        let a = admission.try_admit(ip(1)).unwrap();
        let _b = admission.try_admit(ip(2)).unwrap();
        assert_eq!(
            admission.try_admit(ip(3)).unwrap_err(),
            Rejection::ServerFull { limit: 2 }
        );

        drop(a);
        assert_eq!(admission.active(), 1);
        assert!(admission.try_admit(ip(3)).is_ok());
    }

    #[test]
    fn test_default_admits_thirteen_clients() {
        let admission = Admission::default();
        let _guards: Vec<_> = (1..=13)
            .map(|last| admission.try_admit(ip(last)).unwrap())
            .collect();
        assert_eq!(admission.active(), 13);
        assert_eq!(
            admission.try_admit(ip(14)).unwrap_err(),
            Rejection::ServerFull { limit: 13 }
        );
    }

    #[test]
    fn test_per_address_limit() {
        let admission = Admission::default();
        let guards: Vec<_> = (0..DEFAULT_MAX_PER_ADDRESS)
            .map(|_| admission.try_admit(ip(7)).unwrap())
            .collect();
        let err = admission.try_admit(ip(7)).unwrap_err();
        assert!(err.to_string().contains("(10.0.0.7)"));
        assert!(admission.try_admit(ip(8)).is_ok());

        drop(guards);
        assert_eq!(admission.active_from(ip(7)), 0);
        assert_eq!(admission.active(), 0);
    }

    #[test]
    fn test_guard_outliving_admission() {
        let admission = Admission::new(1, 1);
        let guard = admission.try_admit(ip(1)).unwrap();
        drop(admission);
        assert_eq!(guard.address(), ip(1));
        drop(guard);
    }
}
