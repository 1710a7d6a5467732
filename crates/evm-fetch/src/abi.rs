use alloy_sol_types::sol;

sol! {
    /// The slice of the ERC-20 interface this crate needs: the `transfer`
    /// call a contract-token transaction invokes, and the `Transfer` event
    /// log used to recover its sender (`transfer()`'s input carries no
    /// `from`).
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}
