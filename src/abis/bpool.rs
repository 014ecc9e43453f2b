use alloy::sol;

sol! {
    #[sol(rpc)]
    interface BPool {
        function isPublicSwap() external view returns (bool);
        function getCurrentTokens() external view returns (address[]);
        function getBalance(address token) external view returns (uint256);
        function getNormalizedWeight(address token) external view returns (uint256);
        function getSwapFee() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function balanceOf(address who) external view returns (uint256);
    }
}
