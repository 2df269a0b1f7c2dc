use serde::{Deserialize, Serialize};
use tlr_core::{balance_with_interest, Address, Amount, CoreError, Timestamp};

/// One trustline, stored once per unordered pair of accounts.
///
/// Every field is kept from the perspective of `lo`, the smaller of the two
/// addresses. Use [`Trustline::view`] to read it from either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trustline {
    lo: Address,
    hi: Address,
    /// How much `hi` may owe `lo`.
    creditline_lo_to_hi: Amount,
    /// How much `lo` may owe `hi`.
    creditline_hi_to_lo: Amount,
    /// Rate `lo` charges while `hi` owes it.
    interest_rate_lo_to_hi: i64,
    /// Rate `hi` charges while `lo` owes it.
    interest_rate_hi_to_lo: i64,
    is_frozen: bool,
    /// Time of the last balance write.
    m_time: Timestamp,
    /// Amount `hi` owes `lo` as of `m_time`, before interest.
    balance_lo_to_hi: Amount,
}

impl Trustline {
    /// An empty trustline between `a` and `b`. Panics in debug builds when
    /// `a == b`; the graph rejects self-trustlines before getting here.
    pub fn new(a: Address, b: Address) -> Self {
        debug_assert_ne!(a, b, "trustline endpoints must differ");
        let (lo, hi) = canonical_pair(a, b);
        Self {
            lo,
            hi,
            creditline_lo_to_hi: 0,
            creditline_hi_to_lo: 0,
            interest_rate_lo_to_hi: 0,
            interest_rate_hi_to_lo: 0,
            is_frozen: false,
            m_time: 0,
            balance_lo_to_hi: 0,
        }
    }

    /// Canonical key of this trustline.
    pub fn key(&self) -> (Address, Address) {
        (self.lo, self.hi)
    }

    pub fn endpoints(&self) -> (Address, Address) {
        (self.lo, self.hi)
    }

    /// The other endpoint, or `None` if `user` is not on this trustline.
    pub fn counterparty(&self, user: Address) -> Option<Address> {
        if user == self.lo {
            Some(self.hi)
        } else if user == self.hi {
            Some(self.lo)
        } else {
            None
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    pub fn m_time(&self) -> Timestamp {
        self.m_time
    }

    /// A trustline with nothing left on it can be dropped from the graph.
    pub fn is_closed(&self) -> bool {
        self.balance_lo_to_hi == 0
            && self.creditline_lo_to_hi == 0
            && self.creditline_hi_to_lo == 0
            && self.interest_rate_lo_to_hi == 0
            && self.interest_rate_hi_to_lo == 0
    }

    /// Read the trustline from `user`'s side.
    ///
    /// `user` must be one of the endpoints; any other address is read as if
    /// it were `hi`.
    pub fn view(&self, user: Address) -> AccountView<'_> {
        debug_assert!(user == self.lo || user == self.hi);
        AccountView {
            line: self,
            user_is_lo: user == self.lo,
        }
    }

    /// Set both creditlines as seen by `creditor`.
    pub fn set_creditlines(&mut self, creditor: Address, given: Amount, received: Amount) {
        if creditor == self.lo {
            self.creditline_lo_to_hi = given;
            self.creditline_hi_to_lo = received;
        } else {
            self.creditline_hi_to_lo = given;
            self.creditline_lo_to_hi = received;
        }
    }

    /// Set both interest rates as seen by `creditor`.
    pub fn set_interest_rates(&mut self, creditor: Address, given: i64, received: i64) {
        if creditor == self.lo {
            self.interest_rate_lo_to_hi = given;
            self.interest_rate_hi_to_lo = received;
        } else {
            self.interest_rate_hi_to_lo = given;
            self.interest_rate_lo_to_hi = received;
        }
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.is_frozen = frozen;
    }

    /// Store `balance` (amount the counterparty owes `user`) written at `m_time`.
    pub fn set_balance(&mut self, user: Address, balance: Amount, m_time: Timestamp) {
        self.balance_lo_to_hi = if user == self.lo { balance } else { -balance };
        self.m_time = m_time;
    }

    /// Canonical balance including interest accrued up to `now`.
    fn canonical_balance_with_interest(&self, now: Timestamp) -> Result<Amount, CoreError> {
        balance_with_interest(
            self.balance_lo_to_hi,
            self.interest_rate_lo_to_hi,
            self.interest_rate_hi_to_lo,
            now.saturating_sub(self.m_time),
        )
    }
}

/// Order two addresses so the smaller one comes first.
pub fn canonical_pair(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A trustline seen from one of its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AccountView<'a> {
    line: &'a Trustline,
    user_is_lo: bool,
}

impl<'a> AccountView<'a> {
    pub fn user(&self) -> Address {
        if self.user_is_lo {
            self.line.lo
        } else {
            self.line.hi
        }
    }

    pub fn counterparty(&self) -> Address {
        if self.user_is_lo {
            self.line.hi
        } else {
            self.line.lo
        }
    }

    /// Amount the counterparty owes the user, before interest.
    pub fn balance(&self) -> Amount {
        if self.user_is_lo {
            self.line.balance_lo_to_hi
        } else {
            -self.line.balance_lo_to_hi
        }
    }

    /// Amount the counterparty owes the user, including interest up to `now`.
    pub fn balance_with_interest(&self, now: Timestamp) -> Result<Amount, CoreError> {
        let canonical = self.line.canonical_balance_with_interest(now)?;
        if self.user_is_lo {
            Ok(canonical)
        } else {
            canonical
                .checked_neg()
                .ok_or(CoreError::Overflow { op: "balance with interest" })
        }
    }

    /// Cap on what the counterparty may owe the user.
    pub fn creditline_given(&self) -> Amount {
        if self.user_is_lo {
            self.line.creditline_lo_to_hi
        } else {
            self.line.creditline_hi_to_lo
        }
    }

    /// Cap on what the user may owe the counterparty.
    pub fn creditline_received(&self) -> Amount {
        if self.user_is_lo {
            self.line.creditline_hi_to_lo
        } else {
            self.line.creditline_lo_to_hi
        }
    }

    pub fn interest_rate_given(&self) -> i64 {
        if self.user_is_lo {
            self.line.interest_rate_lo_to_hi
        } else {
            self.line.interest_rate_hi_to_lo
        }
    }

    pub fn interest_rate_received(&self) -> i64 {
        if self.user_is_lo {
            self.line.interest_rate_hi_to_lo
        } else {
            self.line.interest_rate_lo_to_hi
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.line.is_frozen
    }

    pub fn m_time(&self) -> Timestamp {
        self.line.m_time
    }

    /// Largest amount the user can send to the counterparty at `now`.
    /// Zero when the trustline is frozen; negative when the user is already
    /// over the limit.
    pub fn capacity(&self, now: Timestamp) -> Result<Amount, CoreError> {
        if self.line.is_frozen {
            return Ok(0);
        }
        self.balance_with_interest(now)?
            .checked_add(self.creditline_received())
            .ok_or(CoreError::Overflow { op: "capacity" })
    }
}
