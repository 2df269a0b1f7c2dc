use std::collections::{BTreeSet, HashMap};

use tlr_core::{Address, Amount, CoreError, NetworkConfig, Timestamp};

use crate::events::{TrustlineSnapshot, TrustlineUpdate};
use crate::summary::AccountSummary;
use crate::trustline::{canonical_pair, Trustline};

/// In-memory mirror of one currency network.
///
/// Nodes are accounts, edges are trustlines. Every mutation is validated in
/// full before anything is written, so a rejected update leaves the graph
/// untouched. Trustlines that end up closed are removed right away, together
/// with any account that has no trustline left.
#[derive(Debug, Clone)]
pub struct TrustlineGraph {
    config: NetworkConfig,
    /// Neighbour sets, ordered for deterministic traversal.
    friends: HashMap<Address, BTreeSet<Address>>,
    /// Trustlines keyed by their canonical `(lo, hi)` pair.
    trustlines: HashMap<(Address, Address), Trustline>,
}

impl TrustlineGraph {
    /// Create an empty graph for a network with the given settings.
    pub fn new(config: NetworkConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            friends: HashMap::new(),
            trustlines: HashMap::new(),
        })
    }

    /// Build a graph from a full snapshot of the network.
    pub fn from_snapshots<I>(config: NetworkConfig, snapshots: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = TrustlineSnapshot>,
    {
        let mut graph = Self::new(config)?;
        for snapshot in snapshots {
            graph.insert_snapshot(&snapshot)?;
        }
        tracing::info!(
            accounts = graph.node_count(),
            trustlines = graph.trustline_count(),
            "trustline graph built from snapshot"
        );
        Ok(graph)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn has_node(&self, user: Address) -> bool {
        self.friends.contains_key(&user)
    }

    pub fn node_count(&self) -> usize {
        self.friends.len()
    }

    pub fn trustline_count(&self) -> usize {
        self.trustlines.len()
    }

    /// All accounts with at least one trustline, sorted.
    pub fn users(&self) -> Vec<Address> {
        let mut users: Vec<Address> = self.friends.keys().copied().collect();
        users.sort();
        users
    }

    /// Accounts `user` shares a trustline with. Empty for unknown accounts.
    pub fn get_friends(&self, user: Address) -> Vec<Address> {
        self.friends_iter(user).collect()
    }

    pub(crate) fn friends_iter(&self, user: Address) -> impl Iterator<Item = Address> + '_ {
        self.friends
            .get(&user)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn trustline(&self, a: Address, b: Address) -> Option<&Trustline> {
        self.trustlines.get(&canonical_pair(a, b))
    }

    /// Apply a trustline update.
    ///
    /// Creates the trustline if needed. When the network uses custom
    /// interests both rates must be supplied; otherwise the network default
    /// applies in both directions.
    pub fn update_trustline(&mut self, update: &TrustlineUpdate) -> Result<(), CoreError> {
        let creditor = update.creditor;
        let debtor = update.debtor;
        check_distinct(creditor, debtor)?;
        check_non_negative("creditline_given", update.creditline_given)?;
        check_non_negative("creditline_received", update.creditline_received)?;

        let (rate_given, rate_received) = if self.config.custom_interests {
            match (update.interest_rate_given, update.interest_rate_received) {
                (Some(given), Some(received)) => (given, received),
                _ => return Err(CoreError::MissingInterestRate),
            }
        } else {
            let rate = self.config.default_interest_rate;
            (rate, rate)
        };
        check_non_negative("interest_rate_given", rate_given.into())?;
        check_non_negative("interest_rate_received", rate_received.into())?;

        let mut line = self
            .trustline(creditor, debtor)
            .cloned()
            .unwrap_or_else(|| Trustline::new(creditor, debtor));
        line.set_creditlines(creditor, update.creditline_given, update.creditline_received);
        line.set_interest_rates(creditor, rate_given, rate_received);
        line.set_frozen(update.is_frozen);

        tracing::debug!(
            creditor = %creditor,
            debtor = %debtor,
            given = %update.creditline_given,
            received = %update.creditline_received,
            frozen = update.is_frozen,
            "trustline updated"
        );
        self.commit(line);
        Ok(())
    }

    /// Store the balance between `a` and `b` (amount `b` owes `a`).
    ///
    /// The timestamp becomes the trustline's `m_time`. It is mandatory on
    /// networks that accrue interest; elsewhere the previous `m_time` is kept
    /// when it is omitted.
    pub fn update_balance(
        &mut self,
        a: Address,
        b: Address,
        balance: Amount,
        timestamp: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        check_distinct(a, b)?;
        check_negatable(balance)?;
        if self.config.interests_enabled() && timestamp.is_none() {
            return Err(CoreError::MissingTimestamp);
        }

        let mut line = match self.trustline(a, b) {
            Some(line) => line.clone(),
            None => {
                let mut line = Trustline::new(a, b);
                if !self.config.custom_interests {
                    let rate = self.config.default_interest_rate;
                    line.set_interest_rates(a, rate, rate);
                }
                line
            }
        };
        let m_time = timestamp.unwrap_or_else(|| line.m_time());
        line.set_balance(a, balance, m_time);

        tracing::debug!(from = %a, to = %b, balance = %balance, m_time, "balance updated");
        self.commit(line);
        Ok(())
    }

    /// Insert one trustline from a full-sync snapshot, replacing any
    /// existing state for that pair.
    pub fn insert_snapshot(&mut self, snapshot: &TrustlineSnapshot) -> Result<(), CoreError> {
        check_distinct(snapshot.user, snapshot.counter_party)?;
        check_non_negative("creditline_given", snapshot.creditline_given)?;
        check_non_negative("creditline_received", snapshot.creditline_received)?;
        check_non_negative("interest_rate_given", snapshot.interest_rate_given.into())?;
        check_non_negative("interest_rate_received", snapshot.interest_rate_received.into())?;
        check_negatable(snapshot.balance)?;

        let mut line = Trustline::new(snapshot.user, snapshot.counter_party);
        line.set_creditlines(
            snapshot.user,
            snapshot.creditline_given,
            snapshot.creditline_received,
        );
        line.set_interest_rates(
            snapshot.user,
            snapshot.interest_rate_given,
            snapshot.interest_rate_received,
        );
        line.set_frozen(snapshot.is_frozen);
        line.set_balance(snapshot.user, snapshot.balance, snapshot.m_time);
        self.commit(line);
        Ok(())
    }

    /// Amount `b` owes `a` at `now`, including interest. Zero if they share
    /// no trustline.
    pub fn get_balance_with_interest(
        &self,
        a: Address,
        b: Address,
        now: Timestamp,
    ) -> Result<Amount, CoreError> {
        match self.trustline(a, b) {
            Some(line) => line.view(a).balance_with_interest(now),
            None => Ok(0),
        }
    }

    /// Summary of `user`'s trustline with `counter_party`, or of all of
    /// `user`'s trustlines when `counter_party` is `None`.
    pub fn get_account_summary(
        &self,
        user: Address,
        counter_party: Option<Address>,
        now: Timestamp,
    ) -> Result<AccountSummary, CoreError> {
        if let Some(counter_party) = counter_party {
            return self.trustline_summary(user, counter_party, now);
        }

        let mut total = AccountSummary::default();
        for friend in self.friends_iter(user) {
            let account = self.trustline_summary(user, friend, now)?;
            total.balance = checked_sum(total.balance, account.balance)?;
            if account.is_frozen {
                total.frozen_balance = checked_sum(total.frozen_balance, account.balance)?;
            } else {
                total.creditline_given =
                    checked_sum(total.creditline_given, account.creditline_given)?;
                total.creditline_received =
                    checked_sum(total.creditline_received, account.creditline_received)?;
            }
        }
        Ok(total)
    }

    fn trustline_summary(
        &self,
        user: Address,
        counter_party: Address,
        now: Timestamp,
    ) -> Result<AccountSummary, CoreError> {
        let Some(line) = self.trustline(user, counter_party) else {
            return Ok(AccountSummary::default());
        };
        let view = line.view(user);
        let balance = view.balance_with_interest(now)?;
        Ok(AccountSummary {
            balance,
            frozen_balance: if view.is_frozen() { balance } else { 0 },
            creditline_given: view.creditline_given(),
            creditline_received: view.creditline_received(),
            interest_rate_given: view.interest_rate_given(),
            interest_rate_received: view.interest_rate_received(),
            is_frozen: view.is_frozen(),
        })
    }

    /// Export every trustline, seen from its smaller endpoint and sorted by
    /// key. Feeding the result to [`TrustlineGraph::from_snapshots`]
    /// reproduces this graph.
    pub fn snapshot(&self) -> Vec<TrustlineSnapshot> {
        let mut lines: Vec<&Trustline> = self.trustlines.values().collect();
        lines.sort_by_key(|line| line.key());
        lines
            .into_iter()
            .map(|line| {
                let (lo, hi) = line.endpoints();
                let view = line.view(lo);
                TrustlineSnapshot {
                    user: lo,
                    counter_party: hi,
                    creditline_given: view.creditline_given(),
                    creditline_received: view.creditline_received(),
                    interest_rate_given: view.interest_rate_given(),
                    interest_rate_received: view.interest_rate_received(),
                    is_frozen: view.is_frozen(),
                    balance: view.balance(),
                    m_time: view.m_time(),
                }
            })
            .collect()
    }

    /// Store `line`, or drop it if it is closed.
    fn commit(&mut self, line: Trustline) {
        let key = line.key();
        if line.is_closed() {
            if self.trustlines.remove(&key).is_some() {
                self.unlink(key.0, key.1);
                self.unlink(key.1, key.0);
                tracing::info!(a = %key.0, b = %key.1, "closed trustline removed");
            }
            return;
        }
        self.friends.entry(key.0).or_default().insert(key.1);
        self.friends.entry(key.1).or_default().insert(key.0);
        self.trustlines.insert(key, line);
    }

    fn unlink(&mut self, user: Address, friend: Address) {
        if let Some(set) = self.friends.get_mut(&user) {
            set.remove(&friend);
            if set.is_empty() {
                self.friends.remove(&user);
            }
        }
    }
}

fn check_distinct(a: Address, b: Address) -> Result<(), CoreError> {
    if a == b {
        return Err(CoreError::InvalidConfig(format!(
            "trustline endpoints must differ, got {a} twice"
        )));
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: Amount) -> Result<(), CoreError> {
    if value < 0 {
        return Err(CoreError::NegativeAmount { field, value });
    }
    Ok(())
}

/// Balances are stored from one side and negated for the other.
fn check_negatable(balance: Amount) -> Result<(), CoreError> {
    if balance == Amount::MIN {
        return Err(CoreError::Overflow { op: "balance" });
    }
    Ok(())
}

fn checked_sum(a: Amount, b: Amount) -> Result<Amount, CoreError> {
    a.checked_add(b)
        .ok_or(CoreError::Overflow { op: "account summary" })
}
