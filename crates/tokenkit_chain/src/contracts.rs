use alloy::hex;
use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolConstructor;
use anyhow::{Context, Result};

sol! {
    /// Owner-mintable ERC-20 with configurable decimals.
    #[sol(rpc)]
    contract HyperERC20 {
        constructor(string name, string symbol, uint8 decimals);

        function mint(address to, uint256 amount) external;
        function burn(uint256 amount) external;
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    /// The subset of a Uniswap-V2-style router used to seed liquidity.
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function WETH() external pure returns (address);

        function addLiquidityETH(
            address token,
            uint256 amountTokenDesired,
            uint256 amountTokenMin,
            uint256 amountETHMin,
            address to,
            uint256 deadline
        ) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
    }
}

/// Constructor arguments in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorArgs {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl ConstructorArgs {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// ABI-encoded `(string, string, uint8)`.
    pub fn abi_encode(&self) -> Vec<u8> {
        HyperERC20::constructorCall {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
        }
        .abi_encode()
    }

    /// Hex without a `0x` prefix, as explorer verification APIs expect.
    pub fn abi_encode_hex(&self) -> String {
        hex::encode(self.abi_encode())
    }
}

/// Creation bytecode from an artifact followed by the encoded constructor args.
pub fn creation_code(bytecode_hex: &str, args: &ConstructorArgs) -> Result<Bytes> {
    let digits = bytecode_hex.trim().trim_start_matches("0x");
    let mut code =
        hex::decode(digits).context("artifact bytecode is not valid hex (unlinked libraries?)")?;
    code.extend_from_slice(&args.abi_encode());
    Ok(code.into())
}
