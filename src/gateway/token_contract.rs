//! In-memory token contract with the same surface as the remote one.
//!
//! Every call either applies fully or leaves the state untouched.

use std::collections::BTreeMap;

use crate::types::{AccountId, TokenMetadata};

const NOT_INITIALIZED: &str =
    "contract options need to be set before calling any function, call Initialize() to initialize contract";

/// Caller of a contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub account: AccountId,
    pub msp_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct TokenContract {
    metadata: Option<TokenMetadata>,
    balances: BTreeMap<AccountId, u64>,
    /// (owner, spender) -> remaining allowance
    allowances: BTreeMap<(AccountId, AccountId), u64>,
    total_supply: u64,
    /// Organization allowed to initialize and mint.
    minter_msp: String,
}

/// Contract-level rejection; the message is what peers would return.
pub type ContractResult<T> = std::result::Result<T, String>;

impl TokenContract {
    pub fn new(minter_msp: impl Into<String>) -> Self {
        Self {
            minter_msp: minter_msp.into(),
            ..Self::default()
        }
    }

    pub fn metadata(&self) -> Option<&TokenMetadata> {
        self.metadata.as_ref()
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn balance(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u64 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn sum_of_balances(&self) -> u128 {
        self.balances.values().map(|b| u128::from(*b)).sum()
    }

    /// Dispatch a named contract function.
    pub fn execute(&mut self, caller: &Caller, function: &str, args: &[String]) -> ContractResult<Vec<u8>> {
        if function != "Initialize" && self.metadata.is_none() {
            return Err(NOT_INITIALIZED.to_string());
        }

        match function {
            "Initialize" => {
                let [name, symbol, decimals] = expect_args::<3>(function, args)?;
                self.initialize(caller, name, symbol, decimals)?;
                Ok(b"true".to_vec())
            }
            "Mint" => {
                let [amount] = expect_args::<1>(function, args)?;
                self.mint(caller, parse_amount(amount)?)?;
                Ok(b"true".to_vec())
            }
            "Transfer" => {
                let [to, amount] = expect_args::<2>(function, args)?;
                self.transfer(&caller.account, &AccountId(to.clone()), parse_amount(amount)?)?;
                Ok(b"true".to_vec())
            }
            "Approve" => {
                let [spender, amount] = expect_args::<2>(function, args)?;
                self.allowances.insert(
                    (caller.account.clone(), AccountId(spender.clone())),
                    parse_amount(amount)?,
                );
                Ok(b"true".to_vec())
            }
            "TransferFrom" => {
                let [from, to, amount] = expect_args::<3>(function, args)?;
                self.transfer_from(
                    &caller.account,
                    &AccountId(from.clone()),
                    &AccountId(to.clone()),
                    parse_amount(amount)?,
                )?;
                Ok(b"true".to_vec())
            }
            "TokenName" => Ok(self.meta()?.name.clone().into_bytes()),
            "Symbol" => Ok(self.meta()?.symbol.clone().into_bytes()),
            "Decimals" => Ok(self.meta()?.decimals.to_string().into_bytes()),
            "TotalSupply" => Ok(self.total_supply.to_string().into_bytes()),
            "BalanceOf" => {
                let [account] = expect_args::<1>(function, args)?;
                self.existing_balance(&AccountId(account.clone()))
            }
            "ClientAccountID" => Ok(caller.account.0.clone().into_bytes()),
            "ClientAccountBalance" => self.existing_balance(&caller.account),
            "Allowance" => {
                let [owner, spender] = expect_args::<2>(function, args)?;
                let amount = self.allowance(&AccountId(owner.clone()), &AccountId(spender.clone()));
                Ok(amount.to_string().into_bytes())
            }
            other => Err(format!("function '{}' is not defined on the contract", other)),
        }
    }

    fn meta(&self) -> ContractResult<&TokenMetadata> {
        self.metadata.as_ref().ok_or_else(|| NOT_INITIALIZED.to_string())
    }

    fn existing_balance(&self, account: &AccountId) -> ContractResult<Vec<u8>> {
        match self.balances.get(account) {
            Some(balance) => Ok(balance.to_string().into_bytes()),
            None => Err(format!("the account {} does not exist", account)),
        }
    }

    fn initialize(&mut self, caller: &Caller, name: &str, symbol: &str, decimals: &str) -> ContractResult<()> {
        if caller.msp_id != self.minter_msp {
            return Err("client is not authorized to initialize contract".to_string());
        }
        if self.metadata.is_some() {
            return Err("contract options are already set, client is not authorized to change them".to_string());
        }
        let decimals = decimals
            .parse::<u8>()
            .map_err(|_| format!("decimals must be a small unsigned integer, got {:?}", decimals))?;
        self.metadata = Some(TokenMetadata {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        });
        Ok(())
    }

    fn mint(&mut self, caller: &Caller, amount: u64) -> ContractResult<()> {
        if caller.msp_id != self.minter_msp {
            return Err("client is not authorized to mint new tokens".to_string());
        }
        if amount == 0 {
            return Err("mint amount must be a positive integer".to_string());
        }
        let balance = self.balance(&caller.account);
        let new_balance = balance.checked_add(amount).ok_or("balance overflow")?;
        let new_supply = self.total_supply.checked_add(amount).ok_or("total supply overflow")?;
        self.balances.insert(caller.account.clone(), new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u64) -> ContractResult<()> {
        if from == to {
            return Err("cannot transfer to and from same client account".to_string());
        }
        let from_balance = self.balance(from);
        if from_balance < amount {
            return Err(format!("client account {} has insufficient funds", from));
        }
        let to_balance = self
            .balance(to)
            .checked_add(amount)
            .ok_or("recipient balance overflow")?;
        self.balances.insert(from.clone(), from_balance - amount);
        self.balances.insert(to.clone(), to_balance);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> ContractResult<()> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err("the spender does not have enough allowance to spend".to_string());
        }
        self.transfer(from, to, amount)?;
        self.allowances
            .insert((from.clone(), spender.clone()), allowance - amount);
        Ok(())
    }
}

fn expect_args<'a, const N: usize>(function: &str, args: &'a [String]) -> ContractResult<[&'a String; N]> {
    if args.len() != N {
        return Err(format!(
            "incorrect number of arguments for {}: expected {}, got {}",
            function,
            N,
            args.len()
        ));
    }
    let mut out = [&args[0]; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg;
    }
    Ok(out)
}

fn parse_amount(raw: &str) -> ContractResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| format!("amount must be an unsigned integer, got {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(name: &str, msp: &str) -> Caller {
        Caller {
            account: AccountId(format!("x509::/CN={}", name)),
            msp_id: msp.to_string(),
        }
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn initialized() -> (TokenContract, Caller) {
        let mut contract = TokenContract::new("Org1MSP");
        let admin = caller("admin", "Org1MSP");
        contract
            .execute(&admin, "Initialize", &args(&["LoyaltyPoints", "LPT", "2"]))
            .unwrap();
        (contract, admin)
    }

    #[test]
    fn reads_fail_before_initialize() {
        let mut contract = TokenContract::new("Org1MSP");
        let admin = caller("admin", "Org1MSP");
        assert!(contract.execute(&admin, "TokenName", &[]).is_err());
        assert!(contract.execute(&admin, "Mint", &args(&["10"])).is_err());
    }

    #[test]
    fn initialize_is_exactly_once() {
        let (mut contract, admin) = initialized();
        let err = contract
            .execute(&admin, "Initialize", &args(&["Other", "OTH", "0"]))
            .unwrap_err();
        assert!(err.contains("already set"));
        assert_eq!(contract.metadata(), Some(&TokenMetadata::default()));
    }

    #[test]
    fn only_minter_org_mints() {
        let (mut contract, _) = initialized();
        let outsider = caller("mallory", "Org2MSP");
        assert!(contract.execute(&outsider, "Mint", &args(&["5"])).is_err());
        assert_eq!(contract.total_supply(), 0);
    }

    #[test]
    fn transfer_moves_exact_amount_or_nothing() {
        let (mut contract, admin) = initialized();
        let bob = caller("bob", "Org1MSP");
        contract.execute(&admin, "Mint", &args(&["100"])).unwrap();
        contract
            .execute(&admin, "Transfer", &args(&[bob.account.as_str(), "40"]))
            .unwrap();
        assert_eq!(contract.balance(&admin.account), 60);
        assert_eq!(contract.balance(&bob.account), 40);

        assert!(contract
            .execute(&admin, "Transfer", &args(&[bob.account.as_str(), "61"]))
            .is_err());
        assert_eq!(contract.balance(&admin.account), 60);
        assert_eq!(contract.balance(&bob.account), 40);
        assert_eq!(contract.sum_of_balances(), u128::from(contract.total_supply()));
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let (mut contract, admin) = initialized();
        let bob = caller("bob", "Org1MSP");
        contract.execute(&admin, "Mint", &args(&["100"])).unwrap();
        contract
            .execute(&admin, "Transfer", &args(&[bob.account.as_str(), "50"]))
            .unwrap();
        contract
            .execute(&bob, "Approve", &args(&[admin.account.as_str(), "20"]))
            .unwrap();

        assert!(contract
            .execute(&admin, "TransferFrom", &args(&[bob.account.as_str(), admin.account.as_str(), "21"]))
            .is_err());
        assert_eq!(contract.balance(&bob.account), 50);

        contract
            .execute(&admin, "TransferFrom", &args(&[bob.account.as_str(), admin.account.as_str(), "15"]))
            .unwrap();
        assert_eq!(contract.allowance(&bob.account, &admin.account), 5);
        assert_eq!(contract.balance(&bob.account), 35);
        assert_eq!(contract.balance(&admin.account), 65);
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let (mut contract, admin) = initialized();
        assert!(contract.execute(&admin, "Mint", &[]).is_err());
        assert!(contract.execute(&admin, "Nope", &[]).is_err());
    }
}
